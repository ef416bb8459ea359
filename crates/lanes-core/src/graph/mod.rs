//! Row-indexed commit DAG, built lazily from a newest-first commit list.
//!
//! The [`Graph`] turns `(hash, parents)` records into physical rows of
//! [`Node`]s joined by [`Edge`]s. Physical row `i` holds the node of commit
//! `i`, preceded by any edge terminators the builder had to cut there. When
//! some parent never appears in the input, one extra tail row holds the
//! unresolved placeholder nodes.
//!
//! Callers see *visible* rows: physical rows with at least one node that is
//! neither folded into a collapsed fragment nor filtered out. Visible rows are
//! served through a [`CompressedList`], so building is lazy: nothing past the
//! furthest row requested has been constructed.
//!
//! # Identity
//!
//! [`NodeId`]s and [`EdgeId`]s index an arena and stay valid for the life of
//! the graph, across appends, hides and shows.

mod builder;
mod rows;
pub(crate) mod store;

pub use rows::{RowSlot, VisibleRows};
pub use store::GraphStore;

use serde::Serialize;
use tracing::debug;

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::hash::{Commit, Hash};
use crate::list::update::signed_delta;
use crate::list::{CompressedList, UpdateRequest};
use builder::GraphBuilder;

// ---------------------------------------------------------------------------
// Ids and kinds
// ---------------------------------------------------------------------------

/// Arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Arena index of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Rendering strand. Ids are handed out in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BranchId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The row's own commit.
    Commit,
    /// Where a strand was cut because its parent is further down.
    EdgeTerminator,
    /// A parent hash that no commit in the input carries.
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Child to parent.
    Usual,
    /// Stands in for a collapsed fragment.
    HideFragment,
}

/// Anything a row can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum GraphElement {
    Node(NodeId),
    Edge(EdgeId),
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A node as seen from outside the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub hash: Hash,
    pub kind: NodeKind,
    /// Visible row index (of the next visible row if this node is hidden).
    pub row: usize,
    pub branch: BranchId,
    /// Position of the commit in the input, for commit nodes.
    pub commit_index: Option<usize>,
    pub visible: bool,
}

/// An edge as seen from outside the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub id: EdgeId,
    pub up: NodeId,
    pub down: NodeId,
    pub kind: EdgeKind,
    pub branch: BranchId,
    pub visible: bool,
}

/// The visible nodes of one visible row, in row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRow {
    pub index: usize,
    pub nodes: Vec<NodeId>,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Lazily built commit graph.
#[derive(Debug)]
pub struct Graph {
    store: GraphStore,
    rows: CompressedList<VisibleRows>,
}

impl Graph {
    /// Set up a graph over `commits`. Rows are built when first read.
    ///
    /// # Errors
    ///
    /// Returns a malformed-history error ([`GraphError::SelfParent`],
    /// [`GraphError::DuplicateCommit`], [`GraphError::ParentBeforeChild`]).
    pub fn build(commits: Vec<Commit>, config: &GraphConfig) -> Result<Self, GraphError> {
        let count = commits.len();
        let store = GraphStore::new(GraphBuilder::new(commits)?);
        let size = store.visible_len();
        debug!(commits = count, rows = size, "graph ready");
        Ok(Self {
            store,
            rows: CompressedList::new(VisibleRows, size, config.rows),
        })
    }

    /// A graph with no commits yet.
    #[must_use]
    pub fn empty(config: &GraphConfig) -> Self {
        Self {
            store: GraphStore::new(GraphBuilder::default()),
            rows: CompressedList::new(VisibleRows, 0, config.rows),
        }
    }

    /// Number of visible rows.
    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.rows.size()
    }

    #[must_use]
    pub fn commits(&self) -> &[Commit] {
        self.store.builder.commits()
    }

    /// Nodes created so far (grows as rows are built).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.store.arena.nodes.len()
    }

    /// The visible nodes of visible row `index`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IndexOutOfRange`] past the last row.
    pub fn node_row(&mut self, index: usize) -> Result<NodeRow, GraphError> {
        let physical = self.physical_row(index)?;
        let arena = &self.store.arena;
        let nodes = arena.rows[physical]
            .iter()
            .copied()
            .filter(|&id| arena.node_visible(id))
            .collect();
        Ok(NodeRow { index, nodes })
    }

    /// # Errors
    ///
    /// Returns [`GraphError::UnknownElement`] for an id this graph never issued.
    pub fn node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let physical = self.store.ensure_placed(id)?;
        let data = self.store.arena.node(id)?;
        Ok(Node {
            id,
            hash: data.hash,
            kind: data.kind,
            row: self.store.arena.visible_index(physical),
            branch: data.branch,
            commit_index: data.commit_index,
            visible: data.is_visible(),
        })
    }

    /// # Errors
    ///
    /// Returns [`GraphError::UnknownElement`] for an id this graph never issued.
    pub fn edge(&self, id: EdgeId) -> Result<Edge, GraphError> {
        let data = self.store.arena.edge(id)?;
        Ok(Edge {
            id,
            up: data.up,
            down: data.down,
            kind: data.kind,
            branch: data.branch,
            visible: self.store.arena.edge_visible(id),
        })
    }

    /// Visible edges toward the node's parents.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownElement`] for an id this graph never issued.
    pub fn down_edges(&mut self, id: NodeId) -> Result<Vec<EdgeId>, GraphError> {
        self.store.ensure_placed(id)?;
        Ok(self.store.arena.visible_down_edges(id))
    }

    /// Visible edges from the node's children.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownElement`] for an id this graph never issued.
    pub fn up_edges(&mut self, id: NodeId) -> Result<Vec<EdgeId>, GraphError> {
        self.store.ensure_placed(id)?;
        Ok(self.store.arena.visible_up_edges(id))
    }

    /// The commit node for `hash`, building rows down to it if needed.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible alongside the other lookups.
    pub fn commit_node(&mut self, hash: &Hash) -> Result<Option<NodeId>, GraphError> {
        let Some(position) = self.store.builder.position(hash) else {
            return Ok(None);
        };
        self.store.ensure_built(position);
        let arena = &self.store.arena;
        Ok(arena.rows.get(position).and_then(|row| {
            row.iter().copied().find(|&id| {
                let node = &arena.nodes[id.0];
                node.kind == NodeKind::Commit && node.hash == *hash
            })
        }))
    }

    /// Build every remaining row.
    pub fn build_all(&mut self) {
        self.store.build_all();
    }

    /// Physical row behind visible row `index`.
    pub(crate) fn physical_row(&mut self, index: usize) -> Result<usize, GraphError> {
        Ok(self.rows.get(index, &mut self.store)?.physical)
    }

    /// Visible row of a node, building rows until it is placed.
    pub(crate) fn visible_row(&mut self, id: NodeId) -> Result<usize, GraphError> {
        let physical = self.store.ensure_placed(id)?;
        Ok(self.store.arena.visible_index(physical))
    }

    pub(crate) const fn store(&self) -> &GraphStore {
        &self.store
    }

    pub(crate) const fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    /// Resize the visible row list after the store's visibility changed.
    pub(crate) fn apply(&mut self, request: &UpdateRequest) -> Result<(), GraphError> {
        self.rows.recalculate(request)
    }

    /// Queue more (older) commits after the current ones.
    ///
    /// The returned request starts at the first row whose layout can change:
    /// the old tail row, or just below the highest child of a tail node, since
    /// the edges into the tail get new endpoints.
    pub(crate) fn append(&mut self, commits: Vec<Commit>) -> Result<UpdateRequest, GraphError> {
        let old_size = self.rows.size();
        let tail_row = self.store.builder.commits().len();
        let first_changed = self.first_row_touching_tail(tail_row);
        let from = self.store.arena.visible_index(first_changed);

        let count = commits.len();
        self.store.builder.extend(commits)?;
        self.store.builder.remove_tail(&mut self.store.arena);

        let new_size = self.store.visible_len();
        let request = UpdateRequest::new(from, old_size, signed_delta(old_size, new_size))?;
        self.rows.recalculate(&request)?;
        debug!(
            appended = count,
            from,
            old_rows = old_size,
            new_rows = new_size,
            "commits appended"
        );
        Ok(request)
    }

    fn first_row_touching_tail(&self, tail_row: usize) -> usize {
        if !self.store.builder.tail_placed() {
            return tail_row;
        }
        let arena = &self.store.arena;
        let Some(tail) = arena.rows.get(tail_row) else {
            return tail_row;
        };
        tail.iter()
            .flat_map(|node| arena.nodes[node.0].up.iter())
            .filter_map(|edge| arena.nodes[arena.edges[edge.0].up.0].row)
            .map(|row| row + 1)
            .fold(tail_row, usize::min)
    }
}
