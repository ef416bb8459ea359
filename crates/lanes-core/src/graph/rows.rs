//! Visible row sequence over the physical rows.

use crate::error::GraphError;
use crate::graph::store::GraphStore;
use crate::list::Generator;

/// Where visible row `index` lives among the physical rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSlot {
    pub index: usize,
    pub physical: usize,
}

/// Steps from one visible row to the next, skipping physical rows whose
/// nodes are all hidden and building rows on the way.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibleRows;

impl VisibleRows {
    fn next_visible(store: &mut GraphStore, start: usize) -> Result<usize, GraphError> {
        let len = store.physical_len();
        let mut physical = start;
        while physical < len {
            store.ensure_built(physical);
            if store.arena.is_row_visible(physical) {
                return Ok(physical);
            }
            physical += 1;
        }
        Err(GraphError::IndexOutOfRange {
            index: physical,
            len,
        })
    }
}

impl Generator for VisibleRows {
    type Item = RowSlot;
    type Source = GraphStore;

    fn generate_first(&self, store: &mut GraphStore) -> Result<RowSlot, GraphError> {
        let physical = Self::next_visible(store, 0)?;
        Ok(RowSlot { index: 0, physical })
    }

    fn one_step(&self, previous: &RowSlot, store: &mut GraphStore) -> Result<RowSlot, GraphError> {
        let physical = Self::next_visible(store, previous.physical + 1)?;
        Ok(RowSlot {
            index: previous.index + 1,
            physical,
        })
    }
}
