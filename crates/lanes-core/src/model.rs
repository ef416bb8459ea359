//! The facade hosts talk to: graph, layout, fragments and listeners.
//!
//! Every mutating call runs to completion before returning. It resizes the
//! graph rows, invalidates the layout with the same [`UpdateRequest`]s and
//! hands each request to every listener, in order. A call that fails changes
//! nothing and notifies nobody.

use std::fmt;

use tracing::{debug, instrument};

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::fragment::{FragmentManager, GraphFragment, NodePredicate};
use crate::graph::{Graph, GraphElement, NodeRow};
use crate::hash::Commit;
use crate::layout::{CellRow, LayoutModel};
use crate::list::UpdateRequest;

/// Called with every request a mutation produces.
pub type UpdateListener = Box<dyn FnMut(&UpdateRequest)>;

pub struct GraphModel {
    graph: Graph,
    layout: LayoutModel,
    fragments: FragmentManager,
    branch_filter: Option<NodePredicate>,
    listeners: Vec<UpdateListener>,
}

impl fmt::Debug for GraphModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphModel")
            .field("rows", &self.graph.row_count())
            .field("fragments", &self.fragments)
            .field("branch_filter", &self.branch_filter.is_some())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl GraphModel {
    /// A model with no commits yet.
    #[must_use]
    pub fn empty(config: &GraphConfig) -> Self {
        Self::from_graph(Graph::empty(config), config)
    }

    /// # Errors
    ///
    /// Returns a malformed-history error if `commits` can't form a graph.
    pub fn build(commits: Vec<Commit>, config: &GraphConfig) -> Result<Self, GraphError> {
        Ok(Self::from_graph(Graph::build(commits, config)?, config))
    }

    fn from_graph(graph: Graph, config: &GraphConfig) -> Self {
        let layout = LayoutModel::new(&graph, config);
        Self {
            graph,
            layout,
            fragments: FragmentManager::new(),
            branch_filter: None,
            listeners: Vec::new(),
        }
    }

    #[must_use]
    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Read access that may build rows.
    pub const fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    #[must_use]
    pub const fn fragments(&self) -> &FragmentManager {
        &self.fragments
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.graph.row_count()
    }

    /// # Errors
    ///
    /// Returns [`GraphError::IndexOutOfRange`] past the last row.
    pub fn node_row(&mut self, index: usize) -> Result<NodeRow, GraphError> {
        self.graph.node_row(index)
    }

    /// # Errors
    ///
    /// Returns [`GraphError::IndexOutOfRange`] past the last row.
    pub fn cell_row(&mut self, index: usize) -> Result<CellRow, GraphError> {
        self.layout.cell_row(&mut self.graph, index)
    }

    /// What is drawn at (`row`, `column`).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IndexOutOfRange`] past the last row.
    pub fn element_at(
        &mut self,
        row: usize,
        column: usize,
    ) -> Result<Option<GraphElement>, GraphError> {
        self.layout.element_at(&mut self.graph, row, column)
    }

    pub fn add_update_listener(&mut self, listener: UpdateListener) {
        self.listeners.push(listener);
    }

    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Extend the history with older commits.
    ///
    /// Returns the requests delivered to listeners: the append itself, then
    /// the branch filter's if one is set.
    ///
    /// # Errors
    ///
    /// Returns a malformed-history error if the new commits clash with the
    /// existing ones.
    #[instrument(skip(self, commits), fields(count = commits.len()))]
    pub fn append_commits_to_graph(
        &mut self,
        commits: Vec<Commit>,
    ) -> Result<Vec<UpdateRequest>, GraphError> {
        let request = self.graph.append(commits)?;
        self.publish(&request)?;
        let mut requests = vec![request];

        if let Some(filter) = &self.branch_filter {
            let request = self.fragments.filter_branches(&mut self.graph, filter)?;
            self.publish(&request)?;
            requests.push(request);
        }
        Ok(requests)
    }

    /// Show only the branch heads matching `predicate` and their ancestry.
    /// The filter is kept and applied again after appends.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures.
    #[instrument(skip_all)]
    pub fn set_visible_branches_nodes(
        &mut self,
        predicate: NodePredicate,
    ) -> Result<UpdateRequest, GraphError> {
        let request = self.fragments.filter_branches(&mut self.graph, &predicate)?;
        self.branch_filter = Some(predicate);
        self.publish(&request)?;
        Ok(request)
    }

    /// Drop the branch filter.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures.
    #[instrument(skip_all)]
    pub fn clear_visible_branches(&mut self) -> Result<UpdateRequest, GraphError> {
        let request = self.fragments.clear_branch_filter(&mut self.graph)?;
        self.branch_filter = None;
        self.publish(&request)?;
        Ok(request)
    }

    /// Keep nodes matching `predicate` out of every fragment.
    pub fn set_unhidden_nodes(&mut self, predicate: NodePredicate) {
        self.fragments.set_unhidden_nodes(predicate);
    }

    /// # Errors
    ///
    /// Returns [`GraphError::UnknownElement`] for an id the graph never issued.
    pub fn relate_fragment(
        &mut self,
        element: GraphElement,
    ) -> Result<Option<GraphFragment>, GraphError> {
        self.fragments.relate_fragment(&mut self.graph, element)
    }

    /// # Errors
    ///
    /// Returns [`GraphError::InvalidFragment`] if `fragment` is stale.
    #[instrument(skip_all)]
    pub fn hide(&mut self, fragment: &GraphFragment) -> Result<UpdateRequest, GraphError> {
        let request = self.fragments.hide(&mut self.graph, fragment)?;
        self.publish(&request)?;
        Ok(request)
    }

    /// # Errors
    ///
    /// Returns [`GraphError::InvalidFragment`] if `fragment` is stale.
    #[instrument(skip_all)]
    pub fn show(&mut self, fragment: &GraphFragment) -> Result<UpdateRequest, GraphError> {
        let request = self.fragments.show(&mut self.graph, fragment)?;
        self.publish(&request)?;
        Ok(request)
    }

    /// Hide the fragment `element` belongs to, or show it if it is collapsed.
    /// Returns `None` when the element is not part of any fragment.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownElement`] for an id the graph never issued.
    #[instrument(skip(self))]
    pub fn toggle_fragment(
        &mut self,
        element: GraphElement,
    ) -> Result<Option<UpdateRequest>, GraphError> {
        let Some(fragment) = self.relate_fragment(element)? else {
            debug!("element is not part of a fragment");
            return Ok(None);
        };
        let request = if fragment.is_collapsed() {
            self.show(&fragment)?
        } else {
            self.hide(&fragment)?
        };
        Ok(Some(request))
    }

    /// # Errors
    ///
    /// Propagates lookup failures.
    #[instrument(skip_all)]
    pub fn hide_all(&mut self) -> Result<Vec<UpdateRequest>, GraphError> {
        let requests = self.fragments.hide_all(&mut self.graph)?;
        for request in &requests {
            self.publish(request)?;
        }
        Ok(requests)
    }

    /// # Errors
    ///
    /// Propagates lookup failures.
    #[instrument(skip_all)]
    pub fn show_all(&mut self) -> Result<Vec<UpdateRequest>, GraphError> {
        let requests = self.fragments.show_all(&mut self.graph)?;
        for request in &requests {
            self.publish(request)?;
        }
        Ok(requests)
    }

    /// Every fragment in the graph, collapsed or not.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures.
    pub fn all_fragments(&mut self) -> Result<Vec<GraphFragment>, GraphError> {
        self.fragments.fragments(&mut self.graph)
    }

    fn publish(&mut self, request: &UpdateRequest) -> Result<(), GraphError> {
        self.layout.recalculate(request)?;
        debug!(
            from = request.from(),
            to = request.to(),
            added = request.added_element_count(),
            listeners = self.listeners.len(),
            "publishing update"
        );
        for listener in &mut self.listeners {
            listener(request);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn commit(hash: &str, parents: &[&str]) -> Commit {
        Commit::new(
            hash.parse().unwrap(),
            parents.iter().map(|p| p.parse().unwrap()).collect(),
        )
    }

    fn recorder(model: &mut GraphModel) -> Rc<RefCell<Vec<UpdateRequest>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        model.add_update_listener(Box::new(move |request: &UpdateRequest| {
            sink.borrow_mut().push(*request);
        }));
        seen
    }

    #[test]
    fn empty_model_accepts_appends() {
        let mut model = GraphModel::empty(&GraphConfig::default());
        let seen = recorder(&mut model);
        let requests = model
            .append_commits_to_graph(vec![commit("a0", &[])])
            .unwrap();
        assert_eq!(requests, vec![UpdateRequest::new(0, 0, 1).unwrap()]);
        assert_eq!(*seen.borrow(), requests);
        assert_eq!(model.row_count(), 1);
        assert_eq!(model.cell_row(0).unwrap().cells.len(), 1);
    }

    #[test]
    fn listeners_see_mutations_in_order() {
        let mut model = GraphModel::build(
            vec![
                commit("a0", &["a1"]),
                commit("a1", &["a2"]),
                commit("a2", &["a3"]),
                commit("a3", &[]),
            ],
            &GraphConfig::default(),
        )
        .unwrap();
        let seen = recorder(&mut model);

        let element = model.element_at(1, 0).unwrap().unwrap();
        let hidden = model.toggle_fragment(element).unwrap().unwrap();
        assert_eq!(hidden, UpdateRequest::new(0, 4, -2).unwrap());
        assert_eq!(model.row_count(), 2);

        // a0 now sits directly above a3.
        let bottom = model.element_at(1, 0).unwrap();
        assert!(matches!(bottom, Some(GraphElement::Node(_))));
        assert_eq!(model.cell_row(1).unwrap().cells.len(), 1);

        assert_eq!(*seen.borrow(), vec![hidden]);
        model.remove_all_listeners();
        model.show_all().unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(model.row_count(), 4);
    }

    #[test]
    fn failed_mutation_notifies_nobody() {
        let mut model =
            GraphModel::build(vec![commit("a0", &[])], &GraphConfig::default()).unwrap();
        let seen = recorder(&mut model);
        assert!(model.append_commits_to_graph(vec![commit("a0", &[])]).is_err());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn branch_filter_survives_append() {
        let mut model = GraphModel::build(
            vec![commit("c0", &["c1"]), commit("d0", &["d1"])],
            &GraphConfig::default(),
        )
        .unwrap();
        let keep: crate::hash::Hash = "c0".parse().unwrap();
        model
            .set_visible_branches_nodes(Box::new(move |hash: &crate::hash::Hash| *hash == keep))
            .unwrap();
        // c0 plus the unresolved tail holding c1 (d1 is filtered).
        assert_eq!(model.row_count(), 2);

        let requests = model
            .append_commits_to_graph(vec![commit("d1", &[]), commit("c1", &[])])
            .unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(model.row_count(), 2);

        model.clear_visible_branches().unwrap();
        assert_eq!(model.row_count(), 4);
    }
}
