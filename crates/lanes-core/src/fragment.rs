//! Collapsible linear stretches of the graph.
//!
//! # Overview
//!
//! A node is *interior* when it is visible, not force-shown, and has exactly
//! one visible up edge and one visible down edge, both usual. A
//! [`GraphFragment`] is a maximal run of interior nodes on one branch,
//! together with the first non-interior node above it (`up`) and below it
//! (`down`).
//!
//! Hiding a fragment folds its interior nodes and edges and activates a
//! single hide edge from `up` to `down`; showing reverses that exactly. The
//! nodes and edges are never removed, only marked, so node and edge ids
//! survive any number of hide/show cycles.
//!
//! # Requests
//!
//! [`FragmentManager::hide`] and [`FragmentManager::show`] report the rows
//! from `up` to `down` inclusive, with the number of rows that disappeared or
//! came back. The batch operations ([`FragmentManager::hide_all`],
//! [`FragmentManager::show_all`]) compute every range against the state
//! before the batch, coalesce, and return the requests bottom-up.
//!
//! # Branch filter
//!
//! [`FragmentManager::filter_branches`] keeps only what is reachable from
//! selected branch heads (nodes without children). It expands every
//! collapsed fragment first, so folding and filtering never have to be
//! reconciled.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use tracing::debug;

use crate::error::GraphError;
use crate::graph::store::{GraphStore, visible_index_in};
use crate::graph::{EdgeId, EdgeKind, Graph, GraphElement, NodeId};
use crate::hash::Hash;
use crate::list::UpdateRequest;
use crate::list::update::signed_delta;

/// Decides something about a node by its hash.
pub type NodePredicate = Box<dyn Fn(&Hash) -> bool>;

// ---------------------------------------------------------------------------
// GraphFragment
// ---------------------------------------------------------------------------

/// A collapsible run of interior nodes between two endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphFragment {
    up: NodeId,
    down: NodeId,
    /// Top to bottom.
    interior: Vec<NodeId>,
    /// The usual edges joining `up`, the interior nodes and `down`, in order.
    edges: Vec<EdgeId>,
    collapsed: bool,
}

impl GraphFragment {
    #[must_use]
    pub const fn up_node(&self) -> NodeId {
        self.up
    }

    #[must_use]
    pub const fn down_node(&self) -> NodeId {
        self.down
    }

    /// The nodes folded away when the fragment is hidden, top to bottom.
    #[must_use]
    pub fn interior(&self) -> &[NodeId] {
        &self.interior
    }

    /// True if the fragment is currently drawn as a single hide edge.
    #[must_use]
    pub const fn is_collapsed(&self) -> bool {
        self.collapsed
    }
}

// ---------------------------------------------------------------------------
// FragmentManager
// ---------------------------------------------------------------------------

/// Finds fragments and folds or unfolds them.
#[derive(Default)]
pub struct FragmentManager {
    unhidden: Option<NodePredicate>,
    /// Collapsed fragments, keyed by their hide edge.
    collapsed: BTreeMap<EdgeId, GraphFragment>,
}

impl fmt::Debug for FragmentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentManager")
            .field("unhidden", &self.unhidden.is_some())
            .field("collapsed", &self.collapsed.len())
            .finish()
    }
}

/// Physical extent of one fold or unfold, and how many rows it hid or
/// revealed.
struct Change {
    up_row: usize,
    down_row: usize,
    rows: usize,
}

impl FragmentManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes matching `predicate` are never treated as interior, so they
    /// can't be folded away.
    pub fn set_unhidden_nodes(&mut self, predicate: NodePredicate) {
        self.unhidden = Some(predicate);
    }

    pub fn clear_unhidden_nodes(&mut self) {
        self.unhidden = None;
    }

    /// Currently collapsed fragments, in hide-edge order.
    pub fn collapsed_fragments(&self) -> impl Iterator<Item = &GraphFragment> {
        self.collapsed.values()
    }

    /// True if `id` could sit inside a fragment right now.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownElement`] for an id the graph never issued.
    pub fn is_foldable(&self, graph: &mut Graph, id: NodeId) -> Result<bool, GraphError> {
        self.is_interior(graph.store_mut(), id)
    }

    /// The fragment `element` belongs to, if any.
    ///
    /// - a node relates if it is interior;
    /// - a visible usual edge relates through its upper node, or failing
    ///   that its lower node;
    /// - an active hide edge relates to the fragment it stands for.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownElement`] for an id the graph never issued.
    pub fn relate_fragment(
        &self,
        graph: &mut Graph,
        element: GraphElement,
    ) -> Result<Option<GraphFragment>, GraphError> {
        let store = graph.store_mut();
        let start = match element {
            GraphElement::Node(id) => self.is_interior(store, id)?.then_some(id),
            GraphElement::Edge(id) => {
                let edge = store.arena.edge(id)?;
                let (kind, up, down) = (edge.kind, edge.up, edge.down);
                if !store.arena.edge_visible(id) {
                    return Ok(None);
                }
                if kind == EdgeKind::HideFragment {
                    return Ok(self.collapsed.get(&id).cloned());
                }
                if self.is_interior(store, up)? {
                    Some(up)
                } else if self.is_interior(store, down)? {
                    Some(down)
                } else {
                    None
                }
            }
        };
        start.map(|id| self.walk(store, id)).transpose()
    }

    /// Collapse `fragment` into a single hide edge.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidFragment`] if the fragment is already
    /// collapsed or no longer matches the graph. Nothing changes in that case.
    pub fn hide(
        &mut self,
        graph: &mut Graph,
        fragment: &GraphFragment,
    ) -> Result<UpdateRequest, GraphError> {
        self.check_expanded(graph.store_mut(), fragment)?;
        let from = graph.visible_row(fragment.up)?;
        let to = graph.visible_row(fragment.down)? + 1;

        let change = self.fold(graph.store_mut(), fragment);
        let request = UpdateRequest::new(from, to, -signed_delta(0, change.rows))?;
        graph.apply(&request)?;
        debug!(from, to, hidden_rows = change.rows, "fragment hidden");
        Ok(request)
    }

    /// Expand a collapsed `fragment` again.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidFragment`] if the fragment is not the
    /// one currently collapsed between its endpoints.
    pub fn show(
        &mut self,
        graph: &mut Graph,
        fragment: &GraphFragment,
    ) -> Result<UpdateRequest, GraphError> {
        let hide_edge = self.check_collapsed(graph.store(), fragment)?;
        let from = graph.visible_row(fragment.up)?;
        let to = graph.visible_row(fragment.down)? + 1;

        let change = self
            .unfold(graph.store_mut(), hide_edge)
            .ok_or_else(|| invalid_fragment(graph.store(), fragment, "fragment is not collapsed"))?;
        let request = UpdateRequest::new(from, to, signed_delta(0, change.rows))?;
        graph.apply(&request)?;
        debug!(from, to, shown_rows = change.rows, "fragment shown");
        Ok(request)
    }

    /// Every fragment in the graph as it currently stands, top to bottom.
    /// Collapsed fragments are included.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures.
    pub fn fragments(&self, graph: &mut Graph) -> Result<Vec<GraphFragment>, GraphError> {
        graph.build_all();
        let store = graph.store_mut();
        let mut found = Vec::new();
        let mut covered = HashSet::new();
        for row in 0..store.arena.rows.len() {
            for id in store.arena.rows[row].clone() {
                if covered.contains(&id) || !self.is_interior(store, id)? {
                    continue;
                }
                let fragment = self.walk(store, id)?;
                covered.extend(fragment.interior.iter().copied());
                found.push((row, fragment));
            }
        }
        for fragment in self.collapsed.values() {
            let row = store.arena.node(fragment.up)?.row.unwrap_or_default();
            found.push((row, fragment.clone()));
        }
        found.sort_by_key(|(row, fragment)| (*row, fragment.up, fragment.down));
        Ok(found.into_iter().map(|(_, fragment)| fragment).collect())
    }

    /// Hide every fragment, top to bottom.
    ///
    /// Returns coalesced requests against the rows as they were before the
    /// call, bottom-up, so they can be applied one after another.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures.
    pub fn hide_all(&mut self, graph: &mut Graph) -> Result<Vec<UpdateRequest>, GraphError> {
        graph.build_all();
        let store = graph.store_mut();
        let before = store.arena.hidden_rows().clone();

        let mut changes = Vec::new();
        for row in 0..store.arena.rows.len() {
            for id in store.arena.rows[row].clone() {
                if !self.is_interior(store, id)? {
                    continue;
                }
                let fragment = self.walk(store, id)?;
                changes.push(self.fold(store, &fragment));
            }
        }

        debug!(fragments = changes.len(), "hiding all fragments");
        Self::apply_batch(graph, &before, &changes, -1)
    }

    /// Show every collapsed fragment. Requests as for [`Self::hide_all`].
    ///
    /// # Errors
    ///
    /// Propagates lookup failures.
    pub fn show_all(&mut self, graph: &mut Graph) -> Result<Vec<UpdateRequest>, GraphError> {
        let store = graph.store_mut();
        let before = store.arena.hidden_rows().clone();
        let changes = self.unfold_all(store);
        debug!(fragments = changes.len(), "showing all fragments");
        Self::apply_batch(graph, &before, &changes, 1)
    }

    /// Keep only what is reachable from the branch heads matching `keep`.
    ///
    /// Every collapsed fragment is expanded first. The request covers the
    /// whole list.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures.
    pub fn filter_branches(
        &mut self,
        graph: &mut Graph,
        keep: &dyn Fn(&Hash) -> bool,
    ) -> Result<UpdateRequest, GraphError> {
        graph.build_all();
        let old_size = graph.row_count();
        let store = graph.store_mut();
        self.unfold_all(store);

        let arena = &mut store.arena;
        let mut reachable = vec![false; arena.nodes.len()];
        let mut stack: Vec<NodeId> = (0..arena.nodes.len())
            .map(NodeId)
            .filter(|id| {
                let node = &arena.nodes[id.0];
                node.up
                    .iter()
                    .all(|e| arena.edges[e.0].kind != EdgeKind::Usual)
                    && keep(&node.hash)
            })
            .collect();
        let heads = stack.len();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut reachable[id.0], true) {
                continue;
            }
            for edge in &arena.nodes[id.0].down {
                let edge = &arena.edges[edge.0];
                if edge.kind == EdgeKind::Usual {
                    stack.push(edge.down);
                }
            }
        }
        for (index, reached) in reachable.into_iter().enumerate() {
            arena.set_filtered(NodeId(index), !reached);
        }

        let new_size = store.visible_len();
        let request = UpdateRequest::new(0, old_size, signed_delta(old_size, new_size))?;
        graph.apply(&request)?;
        debug!(heads, old_size, new_size, "branch filter applied");
        Ok(request)
    }

    /// Drop the branch filter. Collapsed fragments stay collapsed.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures.
    pub fn clear_branch_filter(&mut self, graph: &mut Graph) -> Result<UpdateRequest, GraphError> {
        let old_size = graph.row_count();
        let store = graph.store_mut();
        for index in 0..store.arena.nodes.len() {
            store.arena.set_filtered(NodeId(index), false);
        }
        let new_size = store.visible_len();
        let request = UpdateRequest::new(0, old_size, signed_delta(old_size, new_size))?;
        graph.apply(&request)?;
        debug!(old_size, new_size, "branch filter cleared");
        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn is_unhidden(&self, hash: &Hash) -> bool {
        self.unhidden.as_ref().is_some_and(|predicate| predicate(hash))
    }

    fn is_interior(&self, store: &mut GraphStore, id: NodeId) -> Result<bool, GraphError> {
        store.ensure_placed(id)?;
        let arena = &store.arena;
        let node = arena.node(id)?;
        if !node.is_visible() || self.is_unhidden(&node.hash) {
            return Ok(false);
        }
        let up = arena.visible_up_edges(id);
        let down = arena.visible_down_edges(id);
        Ok(up.len() == 1
            && down.len() == 1
            && up
                .iter()
                .chain(&down)
                .all(|e| arena.edges[e.0].kind == EdgeKind::Usual))
    }

    /// Grow a fragment outward from the interior node `start`.
    fn walk(&self, store: &mut GraphStore, start: NodeId) -> Result<GraphFragment, GraphError> {
        let branch = store.arena.node(start)?.branch;

        let mut above = Vec::new();
        let mut above_edges = Vec::new();
        let mut current = start;
        let up = loop {
            let edge = single(store.arena.visible_up_edges(current), current)?;
            above_edges.push(edge);
            let next = store.arena.edges[edge.0].up;
            if self.is_interior(store, next)? && store.arena.nodes[next.0].branch == branch {
                above.push(next);
                current = next;
            } else {
                break next;
            }
        };

        let mut interior: Vec<NodeId> = above.into_iter().rev().collect();
        interior.push(start);
        let mut edges: Vec<EdgeId> = above_edges.into_iter().rev().collect();

        current = start;
        let down = loop {
            let edge = single(store.arena.visible_down_edges(current), current)?;
            edges.push(edge);
            let next = store.arena.edges[edge.0].down;
            if self.is_interior(store, next)? && store.arena.nodes[next.0].branch == branch {
                interior.push(next);
                current = next;
            } else {
                break next;
            }
        };

        Ok(GraphFragment {
            up,
            down,
            interior,
            edges,
            collapsed: false,
        })
    }

    fn check_expanded(
        &self,
        store: &mut GraphStore,
        fragment: &GraphFragment,
    ) -> Result<(), GraphError> {
        if fragment.collapsed {
            return Err(invalid_fragment(store, fragment, "fragment is already collapsed"));
        }
        if fragment.interior.is_empty() || fragment.edges.len() != fragment.interior.len() + 1 {
            return Err(invalid_fragment(store, fragment, "fragment has no interior"));
        }
        for &id in &fragment.interior {
            if !self.is_interior(store, id)? {
                return Err(invalid_fragment(
                    store,
                    fragment,
                    "interior node can no longer be folded",
                ));
            }
        }

        let chain = std::iter::once(fragment.up)
            .chain(fragment.interior.iter().copied())
            .chain(std::iter::once(fragment.down));
        let pairs = chain.clone().zip(chain.skip(1));
        for (&edge, (up, down)) in fragment.edges.iter().zip(pairs) {
            let data = store.arena.edge(edge)?;
            let connects = data.kind == EdgeKind::Usual && data.up == up && data.down == down;
            if !connects || !store.arena.edge_visible(edge) {
                return Err(invalid_fragment(
                    store,
                    fragment,
                    "edges no longer connect the fragment",
                ));
            }
        }
        Ok(())
    }

    fn check_collapsed(
        &self,
        store: &GraphStore,
        fragment: &GraphFragment,
    ) -> Result<EdgeId, GraphError> {
        let found = self.collapsed.iter().find(|(_, collapsed)| {
            collapsed.up == fragment.up
                && collapsed.down == fragment.down
                && collapsed.interior == fragment.interior
        });
        match found {
            Some((&edge, _)) if store.arena.edge_visible(edge) => Ok(edge),
            Some(_) => Err(invalid_fragment(
                store,
                fragment,
                "endpoints are hidden",
            )),
            None => Err(invalid_fragment(store, fragment, "fragment is not collapsed")),
        }
    }

    fn fold(&mut self, store: &mut GraphStore, fragment: &GraphFragment) -> Change {
        let arena = &mut store.arena;
        let hidden_before = arena.hidden_row_count();
        for &id in &fragment.interior {
            arena.set_folded(id, true);
        }
        for &edge in &fragment.edges {
            arena.set_edge_hidden(edge, true);
        }
        let hide_edge = arena.hide_edge(fragment.up, fragment.down);
        arena.set_edge_hidden(hide_edge, false);

        let mut collapsed = fragment.clone();
        collapsed.collapsed = true;
        self.collapsed.insert(hide_edge, collapsed);

        Change {
            up_row: arena.nodes[fragment.up.0].row.unwrap_or_default(),
            down_row: arena.nodes[fragment.down.0].row.unwrap_or_default(),
            rows: arena.hidden_row_count() - hidden_before,
        }
    }

    fn unfold(&mut self, store: &mut GraphStore, hide_edge: EdgeId) -> Option<Change> {
        let arena = &mut store.arena;
        let hidden_before = arena.hidden_row_count();
        let fragment = self.collapsed.remove(&hide_edge)?;
        arena.set_edge_hidden(hide_edge, true);
        for &edge in &fragment.edges {
            arena.set_edge_hidden(edge, false);
        }
        for &id in &fragment.interior {
            arena.set_folded(id, false);
        }
        Some(Change {
            up_row: arena.nodes[fragment.up.0].row.unwrap_or_default(),
            down_row: arena.nodes[fragment.down.0].row.unwrap_or_default(),
            rows: hidden_before - arena.hidden_row_count(),
        })
    }

    fn unfold_all(&mut self, store: &mut GraphStore) -> Vec<Change> {
        let edges: Vec<EdgeId> = self.collapsed.keys().copied().collect();
        edges
            .into_iter()
            .filter_map(|edge| self.unfold(store, edge))
            .collect()
    }

    /// Turn physical changes into coalesced requests against `before` and
    /// resize the row list with them.
    fn apply_batch(
        graph: &mut Graph,
        before: &BTreeSet<usize>,
        changes: &[Change],
        sign: isize,
    ) -> Result<Vec<UpdateRequest>, GraphError> {
        let requests = changes
            .iter()
            .map(|change| {
                UpdateRequest::new(
                    visible_index_in(before, change.up_row),
                    visible_index_in(before, change.down_row) + 1,
                    sign * signed_delta(0, change.rows),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let requests = UpdateRequest::coalesce(requests);
        for request in &requests {
            graph.apply(request)?;
        }
        Ok(requests)
    }
}

fn single(edges: Vec<EdgeId>, node: NodeId) -> Result<EdgeId, GraphError> {
    match edges.as_slice() {
        [edge] => Ok(*edge),
        _ => Err(GraphError::UnknownElement(format!(
            "{node:?} is not a fragment interior"
        ))),
    }
}

fn invalid_fragment(
    store: &GraphStore,
    fragment: &GraphFragment,
    reason: &'static str,
) -> GraphError {
    let hash = |id: NodeId| {
        store
            .arena
            .node(id)
            .map_or_else(|_| Hash::default(), |node| node.hash)
    };
    GraphError::InvalidFragment {
        up: hash(fragment.up),
        down: hash(fragment.down),
        reason,
    }
}
