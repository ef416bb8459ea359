//! Row-at-a-time graph construction.
//!
//! Commits arrive newest first, so a parent is always referenced before its
//! own row is reached. Each referenced parent gets a *pending* node as soon as
//! the first child names it; the node is placed when the parent's commit row
//! is processed, or in the unresolved tail row if the parent never shows up.
//!
//! A pending node that gains a second child is only safe to keep open if the
//! very next row is the parent itself. Otherwise the strand is cut: the node
//! is placed in the next row as an edge terminator and a fresh pending node,
//! on the same branch, continues it. That decision is taken when the next row
//! starts, so the rows already produced never change when commits are
//! appended.
//!
//! Processing one commit emits exactly one physical row; the tail row (if
//! any) follows the last commit.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::error::GraphError;
use crate::graph::store::Arena;
use crate::graph::{EdgeKind, NodeId, NodeKind};
use crate::hash::{Commit, Hash};

#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    commits: Vec<Commit>,
    positions: HashMap<Hash, usize>,
    /// Parent hashes that no commit in the input carries.
    missing: HashSet<Hash>,
    pending: HashMap<Hash, NodeId>,
    /// Pending nodes the previous commit attached to as an additional child.
    candidates: Vec<NodeId>,
    processed: usize,
    tail_placed: bool,
}

impl GraphBuilder {
    pub(crate) fn new(commits: Vec<Commit>) -> Result<Self, GraphError> {
        let mut builder = Self::default();
        builder.extend(commits)?;
        Ok(builder)
    }

    pub(crate) fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub(crate) fn position(&self, hash: &Hash) -> Option<usize> {
        self.positions.get(hash).copied()
    }

    /// Physical rows once everything is built: one per commit, plus the
    /// unresolved tail when some parent is missing.
    pub(crate) fn expected_rows(&self) -> usize {
        self.commits.len() + usize::from(!self.missing.is_empty())
    }

    pub(crate) const fn tail_placed(&self) -> bool {
        self.tail_placed
    }

    /// Validate and queue more commits. Nothing changes on error.
    pub(crate) fn extend(&mut self, commits: Vec<Commit>) -> Result<(), GraphError> {
        self.validate(&commits)?;

        let base = self.commits.len();
        for (offset, commit) in commits.iter().enumerate() {
            self.positions.insert(commit.hash, base + offset);
        }
        for commit in &commits {
            self.missing.remove(&commit.hash);
        }
        for commit in &commits {
            for parent in &commit.parents {
                if !self.positions.contains_key(parent) {
                    self.missing.insert(*parent);
                }
            }
        }
        self.commits.extend(commits);
        Ok(())
    }

    fn validate(&self, commits: &[Commit]) -> Result<(), GraphError> {
        let base = self.commits.len();
        let mut incoming: HashMap<Hash, usize> = HashMap::with_capacity(commits.len());
        for (offset, commit) in commits.iter().enumerate() {
            let position = base + offset;
            let earlier = self
                .positions
                .get(&commit.hash)
                .or_else(|| incoming.get(&commit.hash));
            if let Some(&first) = earlier {
                return Err(GraphError::DuplicateCommit {
                    hash: commit.hash,
                    first,
                    second: position,
                });
            }
            incoming.insert(commit.hash, position);
        }

        for (offset, commit) in commits.iter().enumerate() {
            let position = base + offset;
            for parent in &commit.parents {
                if *parent == commit.hash {
                    return Err(GraphError::SelfParent { hash: commit.hash });
                }
                let parent_position = self
                    .positions
                    .get(parent)
                    .or_else(|| incoming.get(parent));
                if parent_position.is_some_and(|&p| p < position) {
                    return Err(GraphError::ParentBeforeChild {
                        child: commit.hash,
                        parent: *parent,
                    });
                }
            }
        }
        Ok(())
    }

    /// Emit the next physical row. Returns `false` once everything is built.
    pub(crate) fn advance(&mut self, arena: &mut Arena) -> bool {
        if self.processed < self.commits.len() {
            self.step(arena);
            return true;
        }
        if self.tail_placed || self.pending.is_empty() {
            return false;
        }
        self.place_tail(arena);
        true
    }

    fn step(&mut self, arena: &mut Arena) {
        let index = self.processed;
        let row = arena.rows.len();
        let commit = self.commits[index].clone();
        let mut row_nodes = Vec::new();

        for candidate in std::mem::take(&mut self.candidates) {
            let data = &arena.nodes[candidate.0];
            if data.row.is_some() || data.hash == commit.hash {
                continue;
            }
            let (hash, branch) = (data.hash, data.branch);
            arena.place(candidate, row, NodeKind::EdgeTerminator);
            let next = arena.new_node(hash, branch);
            arena.new_edge(candidate, next, EdgeKind::Usual, branch);
            self.pending.insert(hash, next);
            row_nodes.push(candidate);
        }

        let node = match self.pending.remove(&commit.hash) {
            Some(node) => node,
            None => {
                let branch = arena.new_branch();
                arena.new_node(commit.hash, branch)
            }
        };
        arena.place(node, row, NodeKind::Commit);
        arena.nodes[node.0].commit_index = Some(index);
        row_nodes.push(node);

        let parents = commit.distinct_parents();
        let own_branch = arena.nodes[node.0].branch;
        for parent in &parents {
            let branch = if parents.len() == 1 {
                own_branch
            } else {
                arena.new_branch()
            };
            if let Some(&existing) = self.pending.get(parent) {
                arena.new_edge(node, existing, EdgeKind::Usual, branch);
                self.candidates.push(existing);
            } else {
                let target = arena.new_node(*parent, branch);
                arena.new_edge(node, target, EdgeKind::Usual, branch);
                self.pending.insert(*parent, target);
            }
        }

        trace!(row, hash = %commit.hash, nodes = row_nodes.len(), "built graph row");
        arena.push_row(row_nodes);
        self.processed += 1;
    }

    fn place_tail(&mut self, arena: &mut Arena) {
        let mut nodes: Vec<NodeId> = self.pending.values().copied().collect();
        nodes.sort_unstable();
        let row = arena.rows.len();
        for &node in &nodes {
            arena.place(node, row, NodeKind::Unresolved);
        }
        debug!(row, unresolved = nodes.len(), "placed unresolved parents");
        arena.push_row(nodes);
        self.tail_placed = true;
    }

    /// Take the tail row back out so building can resume after an append.
    /// The tail nodes go back to pending.
    pub(crate) fn remove_tail(&mut self, arena: &mut Arena) {
        if !self.tail_placed {
            return;
        }
        if let Some(nodes) = arena.pop_row() {
            for node in nodes {
                arena.unplace(node);
            }
        }
        self.tail_placed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(hash: &str, parents: &[&str]) -> Commit {
        Commit::new(
            hash.parse().unwrap(),
            parents.iter().map(|p| p.parse().unwrap()).collect(),
        )
    }

    fn build_all(commits: Vec<Commit>) -> (GraphBuilder, Arena) {
        let mut builder = GraphBuilder::new(commits).unwrap();
        let mut arena = Arena::default();
        while builder.advance(&mut arena) {}
        (builder, arena)
    }

    #[test]
    fn self_parent_is_rejected() {
        let err = GraphBuilder::new(vec![commit("a0", &["a0"])]).unwrap_err();
        assert!(matches!(err, GraphError::SelfParent { .. }));
    }

    #[test]
    fn duplicate_commit_is_rejected() {
        let err = GraphBuilder::new(vec![commit("a0", &[]), commit("a0", &[])]).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DuplicateCommit {
                first: 0,
                second: 1,
                ..
            }
        ));
    }

    #[test]
    fn parent_listed_before_child_is_rejected() {
        let err = GraphBuilder::new(vec![commit("a1", &[]), commit("a0", &["a1"])]).unwrap_err();
        assert!(matches!(err, GraphError::ParentBeforeChild { .. }));
    }

    #[test]
    fn failed_extend_changes_nothing() {
        let mut builder = GraphBuilder::new(vec![commit("a0", &["a1"])]).unwrap();
        let err = builder.extend(vec![commit("a1", &[]), commit("a0", &[])]);
        assert!(err.is_err());
        assert_eq!(builder.commits().len(), 1);
        assert_eq!(builder.expected_rows(), 2);
    }

    #[test]
    fn missing_parent_gets_tail_row() {
        let (builder, arena) = build_all(vec![commit("a0", &["a1"]), commit("a1", &["a2"])]);
        assert_eq!(builder.expected_rows(), 3);
        assert_eq!(arena.rows.len(), 3);
        let tail = &arena.rows[2];
        assert_eq!(tail.len(), 1);
        assert_eq!(arena.nodes[tail[0].0].kind, NodeKind::Unresolved);
        assert!(builder.tail_placed());
    }

    #[test]
    fn second_child_cuts_strand_with_terminator() {
        // a0 and a1 both point at a3; a2 sits between.
        let (_, arena) = build_all(vec![
            commit("a0", &["a3"]),
            commit("a1", &["a3"]),
            commit("a2", &[]),
            commit("a3", &[]),
        ]);
        let row2: Vec<NodeKind> = arena.rows[2]
            .iter()
            .map(|id| arena.nodes[id.0].kind)
            .collect();
        assert_eq!(row2, vec![NodeKind::EdgeTerminator, NodeKind::Commit]);

        let terminator = arena.rows[2][0];
        let continued = arena.nodes[terminator.0].down[0];
        let down = arena.edges[continued.0].down;
        assert_eq!(arena.nodes[down.0].row, Some(3));
        assert_eq!(arena.nodes[down.0].branch, arena.nodes[terminator.0].branch);
    }

    #[test]
    fn merge_parents_start_new_branches() {
        let (_, arena) = build_all(vec![
            commit("a0", &["a1", "a2"]),
            commit("a1", &["a2"]),
            commit("a2", &[]),
        ]);
        let a0 = &arena.nodes[arena.rows[0][0].0];
        let branches: Vec<_> = a0
            .down
            .iter()
            .map(|e| arena.edges[e.0].branch)
            .collect();
        assert_eq!(branches.len(), 2);
        assert_ne!(branches[0], a0.branch);
        assert_ne!(branches[0], branches[1]);
    }

    #[test]
    fn duplicate_parents_make_one_edge() {
        let (_, arena) = build_all(vec![commit("a0", &["a1", "a1"]), commit("a1", &[])]);
        assert_eq!(arena.edges.len(), 1);
    }

    #[test]
    fn remove_tail_then_resume_matches_full_build() {
        let first = vec![commit("a0", &["a2", "a1"]), commit("a1", &["a2"])];
        let rest = vec![commit("b0", &[]), commit("a2", &[])];

        let mut builder = GraphBuilder::new(first.clone()).unwrap();
        let mut arena = Arena::default();
        while builder.advance(&mut arena) {}
        assert_eq!(arena.rows.len(), 3);

        builder.remove_tail(&mut arena);
        builder.extend(rest.clone()).unwrap();
        while builder.advance(&mut arena) {}

        let mut all = first;
        all.extend(rest);
        let (_, fresh) = build_all(all);
        assert_eq!(arena.rows, fresh.rows);
        let kinds = |a: &Arena| a.nodes.iter().map(|n| (n.kind, n.row)).collect::<Vec<_>>();
        assert_eq!(kinds(&arena), kinds(&fresh));
    }
}
