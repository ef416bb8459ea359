//! lanes-core library.
//!
//! Turns a newest-first list of `(hash, parents)` records into a row-indexed
//! commit graph with stable column assignment, and keeps it live under
//! appended history and collapsed or expanded linear stretches.
//!
//! - [`hash`]: commit identity and input records.
//! - [`list`]: lazily generated row sequences and the [`UpdateRequest`]
//!   that invalidates them.
//! - [`graph`]: the row-indexed DAG, built on demand.
//! - [`fragment`]: finding, hiding and showing collapsible stretches; the
//!   branch filter.
//! - [`layout`]: per-row cells with column continuity.
//! - [`model`]: the [`GraphModel`] facade and its update listeners.
//! - [`fixture`]: the text formats used by tests and the CLI.
//!
//! # Conventions
//!
//! - **Errors**: typed [`GraphError`] values carrying a stable [`ErrorCode`];
//!   a failed call leaves the model unchanged.
//! - **Logging**: `tracing` macros (`debug!` for mutations, `trace!` for
//!   per-row work).
//! - **Threading**: single writer. Nothing here locks; callers that share a
//!   model across threads serialize access themselves.

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod fixture;
pub mod fragment;
pub mod graph;
pub mod hash;
pub mod layout;
pub mod list;
pub mod model;

pub use config::GraphConfig;
pub use error::{ErrorCode, GraphError};
pub use fragment::{FragmentManager, GraphFragment, NodePredicate};
pub use graph::{
    BranchId, Edge, EdgeId, EdgeKind, Graph, GraphElement, Node, NodeId, NodeKind, NodeRow,
};
pub use hash::{Commit, Hash};
pub use layout::{Cell, CellKind, CellRow, LayoutModel};
pub use list::UpdateRequest;
pub use model::{GraphModel, UpdateListener};
