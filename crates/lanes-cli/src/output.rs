//! Text and JSON rendering for the `lanes` commands.
//!
//! Text output is the line fixture format from `lanes_core::fixture`, so it
//! can be diffed against hand-written expectations. JSON output names every
//! node by hash; node and edge ids never leave the process.

use std::io::Write;

use anyhow::Context;
use lanes_core::fixture::{render_cell_row, render_graph};
use lanes_core::{CellKind, EdgeKind, GraphFragment, GraphModel, NodeKind};
use serde::Serialize;

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One line per row in the fixture format.
    Text,
    /// A single pretty-printed JSON document.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

#[derive(Debug, Serialize)]
struct CellView {
    column: usize,
    #[serde(flatten)]
    content: CellContent,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CellContent {
    Node { hash: String, kind: NodeKind },
    Edge { up: String, down: String, kind: EdgeKind },
}

#[derive(Debug, Serialize)]
struct CellRowView {
    index: usize,
    cells: Vec<CellView>,
}

#[derive(Debug, Serialize)]
struct GraphNodeView {
    hash: String,
    kind: NodeKind,
    down: Vec<GraphEdgeView>,
}

#[derive(Debug, Serialize)]
struct GraphEdgeView {
    hash: String,
    kind: EdgeKind,
}

#[derive(Debug, Serialize)]
struct GraphRowView {
    index: usize,
    nodes: Vec<GraphNodeView>,
}

#[derive(Debug, Serialize)]
struct FragmentView {
    up: String,
    down: String,
    interior: Vec<String>,
    collapsed: bool,
}

fn write_json<T: Serialize>(w: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value).context("failed to serialize output")?;
    writeln!(w)?;
    Ok(())
}

fn hash_of(model: &mut GraphModel, id: lanes_core::NodeId) -> anyhow::Result<String> {
    Ok(model.graph_mut().node(id)?.hash.to_string())
}

/// Every layout row, in the chosen mode.
pub fn write_cell_rows(
    w: &mut dyn Write,
    model: &mut GraphModel,
    mode: OutputMode,
) -> anyhow::Result<()> {
    if !mode.is_json() {
        for index in 0..model.row_count() {
            let row = model.cell_row(index)?;
            writeln!(w, "{}", render_cell_row(model.graph_mut(), &row)?)?;
        }
        return Ok(());
    }

    let mut rows = Vec::with_capacity(model.row_count());
    for index in 0..model.row_count() {
        let row = model.cell_row(index)?;
        let mut cells = Vec::with_capacity(row.cells.len());
        for cell in row.cells {
            let content = match cell.kind {
                CellKind::Node { node } => {
                    let kind = model.graph_mut().node(node)?.kind;
                    CellContent::Node {
                        hash: hash_of(model, node)?,
                        kind,
                    }
                }
                CellKind::Edge { up, down, kind, .. } => CellContent::Edge {
                    up: hash_of(model, up)?,
                    down: hash_of(model, down)?,
                    kind,
                },
            };
            cells.push(CellView {
                column: cell.column,
                content,
            });
        }
        rows.push(CellRowView { index, cells });
    }
    write_json(w, &rows)
}

/// Every visible graph row, in the chosen mode.
pub fn write_graph_rows(
    w: &mut dyn Write,
    model: &mut GraphModel,
    mode: OutputMode,
) -> anyhow::Result<()> {
    if !mode.is_json() {
        let text = render_graph(model.graph_mut())?;
        if !text.is_empty() {
            writeln!(w, "{text}")?;
        }
        return Ok(());
    }

    let mut rows = Vec::with_capacity(model.row_count());
    for index in 0..model.row_count() {
        let row = model.node_row(index)?;
        let mut nodes = Vec::with_capacity(row.nodes.len());
        for id in row.nodes {
            let graph = model.graph_mut();
            let node = graph.node(id)?;
            let mut down = Vec::new();
            for edge in graph.down_edges(id)? {
                let edge = graph.edge(edge)?;
                down.push(GraphEdgeView {
                    hash: graph.node(edge.down)?.hash.to_string(),
                    kind: edge.kind,
                });
            }
            nodes.push(GraphNodeView {
                hash: node.hash.to_string(),
                kind: node.kind,
                down,
            });
        }
        rows.push(GraphRowView { index, nodes });
    }
    write_json(w, &rows)
}

/// One entry per fragment: endpoints, interior and state.
pub fn write_fragments(
    w: &mut dyn Write,
    model: &mut GraphModel,
    fragments: &[GraphFragment],
    mode: OutputMode,
) -> anyhow::Result<()> {
    let mut views = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let interior = fragment
            .interior()
            .iter()
            .map(|&id| hash_of(model, id))
            .collect::<anyhow::Result<Vec<_>>>()?;
        views.push(FragmentView {
            up: hash_of(model, fragment.up_node())?,
            down: hash_of(model, fragment.down_node())?,
            interior,
            collapsed: fragment.is_collapsed(),
        });
    }

    if mode.is_json() {
        return write_json(w, &views);
    }
    for view in &views {
        let state = if view.collapsed { " (collapsed)" } else { "" };
        writeln!(
            w,
            "{}..{} {}{state}",
            view.up,
            view.down,
            view.interior.join(",")
        )?;
    }
    Ok(())
}
