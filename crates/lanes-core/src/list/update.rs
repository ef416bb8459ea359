//! Row-range invalidation records.

use serde::Serialize;

use crate::error::GraphError;

/// The contiguous row range a mutation invalidated, plus the row delta.
///
/// Indices are in the list as it was *before* the mutation:
///
/// - rows `< from` are untouched;
/// - the old rows `from..to` are replaced by `from..to + added_element_count`;
/// - rows `>= to` move by `added_element_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateRequest {
    from: usize,
    to: usize,
    added_element_count: isize,
}

impl UpdateRequest {
    /// The request that changes nothing.
    pub const IDENTITY: Self = Self {
        from: 0,
        to: 0,
        added_element_count: 0,
    };

    /// Build a request, checking that the replaced range is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidUpdateRequest`] if `to < from` or the
    /// delta would remove more rows than `from..to` holds.
    pub fn new(from: usize, to: usize, added_element_count: isize) -> Result<Self, GraphError> {
        let invalid = GraphError::InvalidUpdateRequest {
            from,
            to,
            added: added_element_count,
            len: to,
        };
        if to < from {
            return Err(invalid);
        }
        let span = isize::try_from(to - from).map_err(|_| invalid.clone())?;
        if span + added_element_count < 0 {
            return Err(invalid);
        }
        Ok(Self {
            from,
            to,
            added_element_count,
        })
    }

    /// Build a request from the old and new extent of the replaced range.
    ///
    /// # Errors
    ///
    /// Same conditions as [`UpdateRequest::new`].
    pub fn from_to_interval(from: usize, old_to: usize, new_to: usize) -> Result<Self, GraphError> {
        let added = signed_delta(old_to, new_to);
        Self::new(from, old_to, added)
    }

    /// First invalidated row.
    #[must_use]
    pub const fn from(&self) -> usize {
        self.from
    }

    /// End (exclusive) of the invalidated rows, before the mutation.
    #[must_use]
    pub const fn to(&self) -> usize {
        self.to
    }

    /// Rows added (positive) or removed (negative).
    #[must_use]
    pub const fn added_element_count(&self) -> isize {
        self.added_element_count
    }

    /// End (exclusive) of the replaced rows, after the mutation.
    #[must_use]
    pub fn new_to(&self) -> usize {
        self.to.saturating_add_signed(self.added_element_count)
    }

    /// True for the request that changes nothing.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.from == self.to && self.added_element_count == 0
    }

    /// Map an old row index to its new index, or `None` if the row was
    /// invalidated.
    #[must_use]
    pub fn translate(&self, old_index: usize) -> Option<usize> {
        if old_index < self.from {
            Some(old_index)
        } else if old_index >= self.to {
            old_index.checked_add_signed(self.added_element_count)
        } else {
            None
        }
    }

    /// Merge requests expressed against the same pre-mutation list.
    ///
    /// Overlapping ranges are fused (deltas summed). The result is ordered
    /// bottom-up so that applying the requests one after another is valid:
    /// each one only moves rows below the ones that follow it.
    #[must_use]
    pub fn coalesce(mut requests: Vec<Self>) -> Vec<Self> {
        requests.retain(|r| !r.is_identity());
        requests.sort_by_key(|r| (r.from, r.to));

        let mut merged: Vec<Self> = Vec::with_capacity(requests.len());
        for request in requests {
            match merged.last_mut() {
                Some(last) if request.from < last.to => {
                    last.to = last.to.max(request.to);
                    last.added_element_count += request.added_element_count;
                }
                _ => merged.push(request),
            }
        }
        merged.reverse();
        merged
    }
}

pub(crate) fn signed_delta(old: usize, new: usize) -> isize {
    if new >= old {
        isize::try_from(new - old).unwrap_or(isize::MAX)
    } else {
        isize::try_from(old - new).map_or(isize::MIN, |d| -d)
    }
}
