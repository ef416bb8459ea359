//! Lazily materialized row sequence.
//!
//! A [`CompressedList`] stands for a long ordered sequence whose element `i`
//! is derived from element `i - 1` by a [`Generator`]. Nothing is computed
//! until a row is asked for. Two stores back it:
//!
//! - **checkpoints**: every `checkpoint_interval`-th element, kept for as
//!   long as it stays valid. They are the restart points for regeneration;
//! - **window**: a bounded run of consecutive recently generated elements,
//!   so scrolling forward or re-reading nearby rows costs nothing.
//!
//! A lookup outside the window restarts from the nearest checkpoint at or
//! before the row and steps forward, so a lookup costs at most
//! `checkpoint_interval` generator steps once the checkpoints exist.
//!
//! [`CompressedList::recalculate`] is the only mutation. It drops every
//! stored element at or after the request's `from`, adjusts the length, and
//! leaves the rest alone: rows before `from` keep returning what they
//! returned before.

use std::collections::VecDeque;

use tracing::trace;

use crate::config::RowCacheConfig;
use crate::error::GraphError;
use crate::list::UpdateRequest;

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Derives each element of a [`CompressedList`] from its predecessor.
///
/// Generators are pure with respect to their `source`: for a fixed source
/// state, `one_step(x)` always yields the same value.
pub trait Generator {
    /// Element type.
    type Item: Clone;
    /// What the generator reads from (the graph, for instance).
    type Source;

    /// Produce element 0.
    ///
    /// # Errors
    ///
    /// Propagates failures from reading `source`.
    fn generate_first(&self, source: &mut Self::Source) -> Result<Self::Item, GraphError>;

    /// Produce the element following `previous`.
    ///
    /// # Errors
    ///
    /// Propagates failures from reading `source`.
    fn one_step(
        &self,
        previous: &Self::Item,
        source: &mut Self::Source,
    ) -> Result<Self::Item, GraphError>;

    /// Produce the element `steps` positions after `previous`.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Generator::one_step`].
    fn generate(
        &self,
        previous: &Self::Item,
        steps: usize,
        source: &mut Self::Source,
    ) -> Result<Self::Item, GraphError> {
        let mut current = previous.clone();
        for _ in 0..steps {
            current = self.one_step(&current, source)?;
        }
        Ok(current)
    }
}

// ---------------------------------------------------------------------------
// CompressedList
// ---------------------------------------------------------------------------

/// A logically long list that stores only checkpoints and a small window.
#[derive(Debug)]
pub struct CompressedList<G: Generator> {
    generator: G,
    size: usize,
    checkpoint_interval: usize,
    window_capacity: usize,
    checkpoints: Vec<G::Item>,
    window_start: usize,
    window: VecDeque<G::Item>,
}

impl<G: Generator> CompressedList<G> {
    /// Create a list of `size` elements that have not been generated yet.
    #[must_use]
    pub fn new(generator: G, size: usize, config: RowCacheConfig) -> Self {
        let config = config.clamped();
        Self {
            generator,
            size,
            checkpoint_interval: config.checkpoint_interval,
            window_capacity: config.window_capacity,
            checkpoints: Vec::new(),
            window_start: 0,
            window: VecDeque::new(),
        }
    }

    /// Logical length.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` if the list has no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of checkpoints currently stored.
    #[must_use]
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Rows currently held in the window.
    #[must_use]
    pub fn window_range(&self) -> std::ops::Range<usize> {
        self.window_start..self.window_start + self.window.len()
    }

    /// The generator this list was built with.
    #[must_use]
    pub const fn generator(&self) -> &G {
        &self.generator
    }

    /// Return element `index`, generating it (and anything before it that
    /// is needed) on demand.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IndexOutOfRange`] for `index >= size`, or any
    /// error the generator raises.
    pub fn get(&mut self, index: usize, source: &mut G::Source) -> Result<G::Item, GraphError> {
        if index >= self.size {
            return Err(GraphError::IndexOutOfRange {
                index,
                len: self.size,
            });
        }

        if self.window_range().contains(&index) {
            return Ok(self.window[index - self.window_start].clone());
        }

        self.restart_point(index, source)?;
        while self.window_end() <= index {
            let next = match self.window.back() {
                Some(previous) => self.generator.one_step(previous, source)?,
                None => self.generator.generate_first(source)?,
            };
            self.push_generated(next);
        }
        Ok(self.window[index - self.window_start].clone())
    }

    /// Invalidate everything from `request.from()` on and resize.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidUpdateRequest`] if the request reaches
    /// past the end of the list; nothing is changed in that case.
    pub fn recalculate(&mut self, request: &UpdateRequest) -> Result<(), GraphError> {
        if request.to() > self.size {
            return Err(GraphError::InvalidUpdateRequest {
                from: request.from(),
                to: request.to(),
                added: request.added_element_count(),
                len: self.size,
            });
        }
        if request.is_identity() {
            return Ok(());
        }

        let new_size = self
            .size
            .checked_add_signed(request.added_element_count())
            .ok_or(GraphError::InvalidUpdateRequest {
                from: request.from(),
                to: request.to(),
                added: request.added_element_count(),
                len: self.size,
            })?;

        let keep_checkpoints = request.from().div_ceil(self.checkpoint_interval);
        self.checkpoints.truncate(keep_checkpoints);

        if self.window_start >= request.from() {
            self.window.clear();
            self.window_start = 0;
        } else {
            self.window.truncate(request.from() - self.window_start);
        }

        trace!(
            from = request.from(),
            old_size = self.size,
            new_size,
            "list recalculated"
        );
        self.size = new_size;
        Ok(())
    }

    fn window_end(&self) -> usize {
        self.window_start + self.window.len()
    }

    /// Position the window so that stepping forward from its last element
    /// reaches `index`.
    fn restart_point(&mut self, index: usize, source: &mut G::Source) -> Result<(), GraphError> {
        let interval = self.checkpoint_interval;
        let reachable = (index / interval).min(self.checkpoints.len().saturating_sub(1));
        let checkpoint_row = reachable * interval;

        // Continuing the window is at least as cheap as a checkpoint restart.
        let window_usable = !self.window.is_empty()
            && self.window_start <= index
            && self.window_end() > checkpoint_row;
        if window_usable {
            return Ok(());
        }

        trace!(index, checkpoint_row, "regenerating rows from checkpoint");
        self.window.clear();
        if let Some(checkpoint) = self.checkpoints.get(reachable) {
            self.window_start = checkpoint_row;
            self.window.push_back(checkpoint.clone());
        } else {
            let first = self.generator.generate_first(source)?;
            self.window_start = 0;
            self.window.push_back(first.clone());
            self.checkpoints.push(first);
        }
        Ok(())
    }

    fn push_generated(&mut self, item: G::Item) {
        let row = self.window_end();
        if row % self.checkpoint_interval == 0 && row / self.checkpoint_interval == self.checkpoints.len()
        {
            self.checkpoints.push(item.clone());
        }
        self.window.push_back(item);
        while self.window.len() > self.window_capacity {
            self.window.pop_front();
            self.window_start += 1;
        }
    }
}
