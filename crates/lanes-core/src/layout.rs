//! Column assignment for nodes and passing edges.
//!
//! Each layout row is an ordered list of graph elements; an element's column
//! is its position in the list. Row `i + 1` is derived from row `i` in
//! place, which is what keeps vertical lines in their columns:
//!
//! - a node is replaced by its visible down edges, farthest lower end first
//!   (ties keep edge creation order);
//! - an edge whose lower end sits in the new row becomes that node, the
//!   first time the node is reached; later edges into it are dropped;
//! - any other edge carries on in its column;
//! - nodes of the new row that no edge reaches (branch heads) go last.
//!
//! Rows are served through a [`CompressedList`] over the [`Graph`], so the
//! layout is as lazy as the graph underneath it.

use std::collections::HashSet;

use serde::Serialize;
use tracing::trace;

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::graph::{EdgeId, EdgeKind, Graph, GraphElement, NodeId};
use crate::list::{CompressedList, Generator, UpdateRequest};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CellKind {
    Node {
        node: NodeId,
    },
    Edge {
        edge: EdgeId,
        up: NodeId,
        down: NodeId,
        kind: EdgeKind,
    },
}

/// One drawn element and its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub column: usize,
    #[serde(flatten)]
    pub kind: CellKind,
}

impl Cell {
    #[must_use]
    pub const fn element(&self) -> GraphElement {
        match self.kind {
            CellKind::Node { node } => GraphElement::Node(node),
            CellKind::Edge { edge, .. } => GraphElement::Edge(edge),
        }
    }
}

/// Cells of one visible row, left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellRow {
    pub index: usize,
    pub cells: Vec<Cell>,
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Element list of one row, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRow {
    pub index: usize,
    pub elements: Vec<GraphElement>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutGenerator;

impl LayoutGenerator {
    /// Visible down edges of `node`, farthest lower end first.
    fn ordered_down_edges(graph: &mut Graph, node: NodeId) -> Result<Vec<EdgeId>, GraphError> {
        let edges = graph.down_edges(node)?;
        let mut keyed = Vec::with_capacity(edges.len());
        for edge in edges {
            let down = graph.edge(edge)?.down;
            keyed.push((graph.visible_row(down)?, edge));
        }
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(keyed.into_iter().map(|(_, edge)| edge).collect())
    }
}

impl Generator for LayoutGenerator {
    type Item = LayoutRow;
    type Source = Graph;

    fn generate_first(&self, graph: &mut Graph) -> Result<LayoutRow, GraphError> {
        let row = graph.node_row(0)?;
        Ok(LayoutRow {
            index: 0,
            elements: row.nodes.into_iter().map(GraphElement::Node).collect(),
        })
    }

    fn one_step(&self, previous: &LayoutRow, graph: &mut Graph) -> Result<LayoutRow, GraphError> {
        let index = previous.index + 1;
        let row = graph.node_row(index)?;
        let in_row: HashSet<NodeId> = row.nodes.iter().copied().collect();
        let mut reached = HashSet::new();
        let mut elements = Vec::with_capacity(previous.elements.len() + row.nodes.len());

        let mut carry = |edge: EdgeId, graph: &Graph| -> Result<(), GraphError> {
            let down = graph.edge(edge)?.down;
            if !in_row.contains(&down) {
                elements.push(GraphElement::Edge(edge));
            } else if reached.insert(down) {
                elements.push(GraphElement::Node(down));
            }
            Ok(())
        };

        for element in &previous.elements {
            match *element {
                GraphElement::Node(node) => {
                    for edge in Self::ordered_down_edges(graph, node)? {
                        carry(edge, graph)?;
                    }
                }
                GraphElement::Edge(edge) => carry(edge, graph)?,
            }
        }

        for node in row.nodes {
            if !reached.contains(&node) && graph.up_edges(node)?.is_empty() {
                elements.push(GraphElement::Node(node));
            }
        }

        trace!(row = index, columns = elements.len(), "laid out row");
        Ok(LayoutRow { index, elements })
    }
}

// ---------------------------------------------------------------------------
// LayoutModel
// ---------------------------------------------------------------------------

/// Per-row cells over a [`Graph`].
#[derive(Debug)]
pub struct LayoutModel {
    rows: CompressedList<LayoutGenerator>,
}

impl LayoutModel {
    /// Lay out `graph` lazily; nothing is computed until a row is read.
    #[must_use]
    pub fn new(graph: &Graph, config: &GraphConfig) -> Self {
        Self {
            rows: CompressedList::new(LayoutGenerator, graph.row_count(), config.layout),
        }
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.rows.size()
    }

    /// Element list of row `index`, in column order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IndexOutOfRange`] past the last row.
    pub fn elements(&mut self, graph: &mut Graph, index: usize) -> Result<Vec<GraphElement>, GraphError> {
        Ok(self.rows.get(index, graph)?.elements)
    }

    /// Cells of row `index`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IndexOutOfRange`] past the last row.
    pub fn cell_row(&mut self, graph: &mut Graph, index: usize) -> Result<CellRow, GraphError> {
        let row = self.rows.get(index, graph)?;
        let cells = row
            .elements
            .iter()
            .enumerate()
            .map(|(column, element)| {
                let kind = match *element {
                    GraphElement::Node(node) => CellKind::Node { node },
                    GraphElement::Edge(edge) => {
                        let data = graph.edge(edge)?;
                        CellKind::Edge {
                            edge,
                            up: data.up,
                            down: data.down,
                            kind: data.kind,
                        }
                    }
                };
                Ok(Cell { column, kind })
            })
            .collect::<Result<_, GraphError>>()?;
        Ok(CellRow { index, cells })
    }

    /// The element drawn at (`row`, `column`), if the row is that wide.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IndexOutOfRange`] past the last row.
    pub fn element_at(
        &mut self,
        graph: &mut Graph,
        row: usize,
        column: usize,
    ) -> Result<Option<GraphElement>, GraphError> {
        Ok(self.rows.get(row, graph)?.elements.get(column).copied())
    }

    /// Invalidate rows after a graph mutation.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidUpdateRequest`] if the request does not
    /// fit the current rows.
    pub fn recalculate(&mut self, request: &UpdateRequest) -> Result<(), GraphError> {
        self.rows.recalculate(request)
    }
}
