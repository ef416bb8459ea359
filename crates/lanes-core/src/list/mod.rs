//! Lazy row sequences and their invalidation records.
//!
//! Both the visible graph rows and the layout rows are exposed as
//! [`CompressedList`]s: long sequences generated one row from the previous
//! one, materialized only where callers look, and invalidated by
//! [`UpdateRequest`]s when the graph changes.

pub mod compressed;
pub mod update;

pub use compressed::{CompressedList, Generator};
pub use update::UpdateRequest;
