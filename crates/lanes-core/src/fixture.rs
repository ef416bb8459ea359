//! Line-oriented text formats for histories and rendered rows.
//!
//! # Input
//!
//! One commit per line, newest first:
//!
//! ```text
//! a0|-a3 a1
//! a1|-
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.
//!
//! # Output
//!
//! - [`render_layout`]: per row, cells left to right separated by spaces;
//!   a node prints its hash, an edge prints `up:down`.
//! - [`render_graph`]: per row, its visible nodes as
//!   `<hash>[~|?][><down>,...]` (`~` edge terminator, `?` unresolved,
//!   `=` in front of the target of a hide edge).

use crate::error::GraphError;
use crate::graph::{EdgeKind, Graph, GraphElement, NodeKind};
use crate::hash::{Commit, Hash, HashParseError};
use crate::layout::{CellKind, CellRow};
use crate::model::GraphModel;

const SEPARATOR: &str = "|-";

/// Errors from [`parse_commits`]. Line numbers are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixtureError {
    #[error("line {line}: expected '<hash>|-<parents>'")]
    MissingSeparator { line: usize },

    #[error("line {line}: invalid hash '{text}': {source}")]
    InvalidHash {
        line: usize,
        text: String,
        source: HashParseError,
    },
}

/// Parse a newest-first history.
///
/// # Errors
///
/// Returns the first malformed line.
pub fn parse_commits(input: &str) -> Result<Vec<Commit>, FixtureError> {
    let mut commits = Vec::new();
    for (i, raw) in input.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((hash, parents)) = trimmed.split_once(SEPARATOR) else {
            return Err(FixtureError::MissingSeparator { line });
        };
        let parse = |text: &str| {
            text.parse::<Hash>().map_err(|source| FixtureError::InvalidHash {
                line,
                text: text.to_string(),
                source,
            })
        };
        let hash = parse(hash.trim())?;
        let parents = parents
            .split_whitespace()
            .map(parse)
            .collect::<Result<Vec<_>, _>>()?;
        commits.push(Commit::new(hash, parents));
    }
    Ok(commits)
}

/// One layout row as text, hashes in their seven-digit short form.
///
/// # Errors
///
/// Propagates lookup failures.
pub fn render_cell_row(graph: &mut Graph, row: &CellRow) -> Result<String, GraphError> {
    let mut parts = Vec::with_capacity(row.cells.len());
    for cell in &row.cells {
        let text = match cell.kind {
            CellKind::Node { node } => graph.node(node)?.hash.short(),
            CellKind::Edge { up, down, .. } => {
                format!("{}:{}", graph.node(up)?.hash.short(), graph.node(down)?.hash.short())
            }
        };
        parts.push(text);
    }
    Ok(parts.join(" "))
}

/// Every layout row, one per line.
///
/// # Errors
///
/// Propagates lookup failures.
pub fn render_layout(model: &mut GraphModel) -> Result<String, GraphError> {
    let mut lines = Vec::with_capacity(model.row_count());
    for index in 0..model.row_count() {
        let row = model.cell_row(index)?;
        lines.push(render_cell_row(model.graph_mut(), &row)?);
    }
    Ok(lines.join("\n"))
}

/// Every visible graph row, one per line.
///
/// # Errors
///
/// Propagates lookup failures.
pub fn render_graph(graph: &mut Graph) -> Result<String, GraphError> {
    let mut lines = Vec::with_capacity(graph.row_count());
    for index in 0..graph.row_count() {
        let row = graph.node_row(index)?;
        let mut parts = Vec::with_capacity(row.nodes.len());
        for id in row.nodes {
            let node = graph.node(id)?;
            let mut text = node.hash.to_string();
            match node.kind {
                NodeKind::Commit => {}
                NodeKind::EdgeTerminator => text.push('~'),
                NodeKind::Unresolved => text.push('?'),
            }

            let mut targets = Vec::new();
            for edge in graph.down_edges(id)? {
                let edge = graph.edge(edge)?;
                let marker = if edge.kind == EdgeKind::HideFragment { "=" } else { "" };
                targets.push(format!("{marker}{}", graph.node(edge.down)?.hash));
            }
            if !targets.is_empty() {
                text.push('>');
                text.push_str(&targets.join(","));
            }
            parts.push(text);
        }
        lines.push(parts.join(" "));
    }
    Ok(lines.join("\n"))
}

/// Hash of the node or edge ends behind `element`, for messages.
///
/// # Errors
///
/// Returns [`GraphError::UnknownElement`] for an id the graph never issued.
pub fn describe_element(graph: &mut Graph, element: GraphElement) -> Result<String, GraphError> {
    match element {
        GraphElement::Node(id) => Ok(graph.node(id)?.hash.to_string()),
        GraphElement::Edge(id) => {
            let edge = graph.edge(id)?;
            Ok(format!(
                "{}:{}",
                graph.node(edge.up)?.hash,
                graph.node(edge.down)?.hash
            ))
        }
    }
}
