//! Arena storage for nodes, edges and physical rows.
//!
//! Nodes and edges live in flat vectors and are referred to by index
//! ([`NodeId`], [`EdgeId`]); nothing is ever removed, so ids stay valid for
//! the life of the graph. Physical rows are appended by the builder as they
//! are needed.
//!
//! Visibility is tracked per node (folded into a hidden fragment, or
//! filtered out by the branch filter) and per edge. A physical row whose
//! nodes are all invisible drops out of the visible row sequence; the set of
//! such rows is kept so that physical and visible indices convert cheaply.

use std::collections::BTreeSet;

use crate::error::GraphError;
use crate::graph::builder::GraphBuilder;
use crate::graph::{BranchId, EdgeId, EdgeKind, NodeId, NodeKind};
use crate::hash::Hash;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) hash: Hash,
    pub(crate) kind: NodeKind,
    /// Physical row; `None` while the builder still holds the node pending.
    pub(crate) row: Option<usize>,
    pub(crate) branch: BranchId,
    pub(crate) commit_index: Option<usize>,
    pub(crate) up: Vec<EdgeId>,
    pub(crate) down: Vec<EdgeId>,
    /// Interior of a collapsed fragment.
    pub(crate) folded: bool,
    /// Excluded by the branch filter.
    pub(crate) filtered: bool,
}

impl NodeData {
    pub(crate) const fn is_visible(&self) -> bool {
        !self.folded && !self.filtered
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EdgeData {
    pub(crate) up: NodeId,
    pub(crate) down: NodeId,
    pub(crate) kind: EdgeKind,
    pub(crate) branch: BranchId,
    /// Usual edges: inside a collapsed fragment. Hide edges: fragment shown.
    pub(crate) hidden: bool,
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(crate) struct Arena {
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) edges: Vec<EdgeData>,
    pub(crate) rows: Vec<Vec<NodeId>>,
    row_visible: Vec<usize>,
    hidden_rows: BTreeSet<usize>,
    next_branch: u32,
}

impl Arena {
    pub(crate) fn new_branch(&mut self) -> BranchId {
        let branch = BranchId(self.next_branch);
        self.next_branch += 1;
        branch
    }

    pub(crate) fn new_node(&mut self, hash: Hash, branch: BranchId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            hash,
            kind: NodeKind::Unresolved,
            row: None,
            branch,
            commit_index: None,
            up: Vec::new(),
            down: Vec::new(),
            folded: false,
            filtered: false,
        });
        id
    }

    pub(crate) fn new_edge(
        &mut self,
        up: NodeId,
        down: NodeId,
        kind: EdgeKind,
        branch: BranchId,
    ) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(EdgeData {
            up,
            down,
            kind,
            branch,
            hidden: false,
        });
        self.nodes[up.0].down.push(id);
        self.nodes[down.0].up.push(id);
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| GraphError::UnknownElement(format!("{id:?}")))
    }

    pub(crate) fn edge(&self, id: EdgeId) -> Result<&EdgeData, GraphError> {
        self.edges
            .get(id.0)
            .ok_or_else(|| GraphError::UnknownElement(format!("{id:?}")))
    }

    pub(crate) fn place(&mut self, id: NodeId, row: usize, kind: NodeKind) {
        let node = &mut self.nodes[id.0];
        node.row = Some(row);
        node.kind = kind;
    }

    /// Return a node to pending. Filtering is reset; it is decided again
    /// once the node has a row.
    pub(crate) fn unplace(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        node.row = None;
        node.kind = NodeKind::Unresolved;
        node.filtered = false;
    }

    /// Append a completed physical row.
    pub(crate) fn push_row(&mut self, nodes: Vec<NodeId>) {
        let index = self.rows.len();
        let visible = nodes
            .iter()
            .filter(|id| self.nodes[id.0].is_visible())
            .count();
        if visible == 0 {
            self.hidden_rows.insert(index);
        }
        self.row_visible.push(visible);
        self.rows.push(nodes);
    }

    /// Remove the last physical row, returning its nodes.
    pub(crate) fn pop_row(&mut self) -> Option<Vec<NodeId>> {
        let nodes = self.rows.pop()?;
        self.row_visible.pop();
        self.hidden_rows.remove(&self.rows.len());
        Some(nodes)
    }

    pub(crate) fn node_visible(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_visible()
    }

    pub(crate) fn edge_visible(&self, id: EdgeId) -> bool {
        let edge = &self.edges[id.0];
        !edge.hidden && self.node_visible(edge.up) && self.node_visible(edge.down)
    }

    pub(crate) fn visible_down_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.nodes[id.0]
            .down
            .iter()
            .copied()
            .filter(|&e| self.edge_visible(e))
            .collect()
    }

    pub(crate) fn visible_up_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.nodes[id.0]
            .up
            .iter()
            .copied()
            .filter(|&e| self.edge_visible(e))
            .collect()
    }

    pub(crate) fn set_folded(&mut self, id: NodeId, folded: bool) {
        self.update_visibility(id, |node| node.folded = folded);
    }

    pub(crate) fn set_filtered(&mut self, id: NodeId, filtered: bool) {
        self.update_visibility(id, |node| node.filtered = filtered);
    }

    pub(crate) fn set_edge_hidden(&mut self, id: EdgeId, hidden: bool) {
        self.edges[id.0].hidden = hidden;
    }

    /// An inactive hide edge between `up` and `down`, creating one if every
    /// existing edge already stands for a collapsed fragment. Parallel
    /// fragments between the same endpoints each get their own edge.
    pub(crate) fn hide_edge(&mut self, up: NodeId, down: NodeId) -> EdgeId {
        let existing = self.nodes[up.0].down.iter().copied().find(|&e| {
            let edge = &self.edges[e.0];
            edge.kind == EdgeKind::HideFragment && edge.down == down && edge.hidden
        });
        existing.unwrap_or_else(|| {
            let branch = self.nodes[up.0].branch;
            let id = self.new_edge(up, down, EdgeKind::HideFragment, branch);
            self.edges[id.0].hidden = true;
            id
        })
    }

    /// True if the physical row has at least one visible node. Rows not
    /// built yet cannot have been hidden.
    pub(crate) fn is_row_visible(&self, physical: usize) -> bool {
        self.row_visible.get(physical).is_none_or(|&count| count > 0)
    }

    pub(crate) fn hidden_row_count(&self) -> usize {
        self.hidden_rows.len()
    }

    /// Visible index of a physical row (of the next visible row, if the
    /// row itself is hidden).
    pub(crate) fn visible_index(&self, physical: usize) -> usize {
        visible_index_in(&self.hidden_rows, physical)
    }

    pub(crate) const fn hidden_rows(&self) -> &BTreeSet<usize> {
        &self.hidden_rows
    }

    fn update_visibility(&mut self, id: NodeId, change: impl FnOnce(&mut NodeData)) {
        let node = &mut self.nodes[id.0];
        let was_visible = node.is_visible();
        change(node);
        let now_visible = node.is_visible();
        let Some(row) = node.row else {
            return;
        };
        if was_visible == now_visible || row >= self.row_visible.len() {
            return;
        }

        let count = &mut self.row_visible[row];
        if now_visible {
            *count += 1;
            if *count == 1 {
                self.hidden_rows.remove(&row);
            }
        } else {
            *count -= 1;
            if *count == 0 {
                self.hidden_rows.insert(row);
            }
        }
    }
}

/// [`Arena::visible_index`] against a saved set of hidden rows.
pub(crate) fn visible_index_in(hidden_rows: &BTreeSet<usize>, physical: usize) -> usize {
    physical - hidden_rows.range(..physical).count()
}

// ---------------------------------------------------------------------------
// GraphStore
// ---------------------------------------------------------------------------

/// Arena plus the builder that fills it on demand.
#[derive(Debug)]
pub struct GraphStore {
    pub(crate) arena: Arena,
    pub(crate) builder: GraphBuilder,
}

impl GraphStore {
    pub(crate) fn new(builder: GraphBuilder) -> Self {
        Self {
            arena: Arena::default(),
            builder,
        }
    }

    /// Total physical rows once everything is built.
    pub(crate) fn physical_len(&self) -> usize {
        self.builder.expected_rows()
    }

    pub(crate) fn visible_len(&self) -> usize {
        self.physical_len() - self.arena.hidden_row_count()
    }

    /// Build rows until physical row `physical` exists (or input runs out).
    pub(crate) fn ensure_built(&mut self, physical: usize) {
        while self.arena.rows.len() <= physical {
            if !self.builder.advance(&mut self.arena) {
                break;
            }
        }
    }

    pub(crate) fn build_all(&mut self) {
        while self.builder.advance(&mut self.arena) {}
    }

    /// Build rows until `id` has been given a row, returning it.
    pub(crate) fn ensure_placed(&mut self, id: NodeId) -> Result<usize, GraphError> {
        loop {
            if let Some(row) = self.arena.node(id)?.row {
                return Ok(row);
            }
            if !self.builder.advance(&mut self.arena) {
                return Err(GraphError::UnknownElement(format!("{id:?} never placed")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(s: &str) -> Hash {
        s.parse().unwrap()
    }

    #[test]
    fn new_edge_links_both_ends() {
        let mut arena = Arena::default();
        let branch = arena.new_branch();
        let a = arena.new_node(hash("a0"), branch);
        let b = arena.new_node(hash("a1"), branch);
        let e = arena.new_edge(a, b, EdgeKind::Usual, branch);

        assert_eq!(arena.nodes[a.0].down, vec![e]);
        assert_eq!(arena.nodes[b.0].up, vec![e]);
        assert!(arena.edge_visible(e));
    }

    #[test]
    fn folding_every_node_hides_the_row() {
        let mut arena = Arena::default();
        let branch = arena.new_branch();
        let a = arena.new_node(hash("a0"), branch);
        let b = arena.new_node(hash("a1"), branch);
        let c = arena.new_node(hash("a2"), branch);
        arena.place(a, 0, NodeKind::Commit);
        arena.place(b, 1, NodeKind::EdgeTerminator);
        arena.place(c, 1, NodeKind::Commit);
        arena.push_row(vec![a]);
        arena.push_row(vec![b, c]);

        arena.set_folded(b, true);
        assert!(arena.is_row_visible(1));
        arena.set_folded(c, true);
        assert!(!arena.is_row_visible(1));
        assert_eq!(arena.hidden_row_count(), 1);
        assert_eq!(arena.visible_index(2), 1);

        arena.set_folded(c, false);
        assert!(arena.is_row_visible(1));
        assert_eq!(arena.hidden_row_count(), 0);
    }

    #[test]
    fn filter_and_fold_compose() {
        let mut arena = Arena::default();
        let branch = arena.new_branch();
        let a = arena.new_node(hash("a0"), branch);
        arena.place(a, 0, NodeKind::Commit);
        arena.push_row(vec![a]);

        arena.set_filtered(a, true);
        arena.set_folded(a, true);
        arena.set_filtered(a, false);
        assert!(!arena.is_row_visible(0));
        arena.set_folded(a, false);
        assert!(arena.is_row_visible(0));
    }

    #[test]
    fn hide_edge_is_reused() {
        let mut arena = Arena::default();
        let branch = arena.new_branch();
        let a = arena.new_node(hash("a0"), branch);
        let b = arena.new_node(hash("a1"), branch);
        let first = arena.hide_edge(a, b);
        assert!(arena.edges[first.0].hidden);
        let second = arena.hide_edge(a, b);
        assert_eq!(first, second);
        assert_eq!(arena.edges.len(), 1);
    }

    #[test]
    fn active_hide_edge_is_not_shared() {
        let mut arena = Arena::default();
        let branch = arena.new_branch();
        let a = arena.new_node(hash("a0"), branch);
        let b = arena.new_node(hash("a1"), branch);
        let first = arena.hide_edge(a, b);
        arena.set_edge_hidden(first, false);
        let second = arena.hide_edge(a, b);
        assert_ne!(first, second);
        assert!(arena.edges[second.0].hidden);

        arena.set_edge_hidden(first, true);
        arena.set_edge_hidden(second, false);
        assert_eq!(arena.hide_edge(a, b), first);
        assert_eq!(arena.edges.len(), 2);
    }

    #[test]
    fn pop_row_forgets_hidden_state() {
        let mut arena = Arena::default();
        let branch = arena.new_branch();
        let a = arena.new_node(hash("a0"), branch);
        arena.place(a, 0, NodeKind::Unresolved);
        arena.set_filtered(a, true);
        arena.push_row(vec![a]);
        assert_eq!(arena.hidden_row_count(), 1);

        assert_eq!(arena.pop_row(), Some(vec![a]));
        assert_eq!(arena.hidden_row_count(), 0);
        assert!(arena.is_row_visible(0));
    }
}
