use std::fmt;

use crate::hash::Hash;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MalformedHistory,
    IndexOutOfRange,
    InvalidFragment,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MalformedHistory => "E1001",
            Self::IndexOutOfRange => "E2001",
            Self::InvalidFragment => "E3001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MalformedHistory => "Malformed commit history",
            Self::IndexOutOfRange => "Row or element index out of range",
            Self::InvalidFragment => "Fragment no longer matches the graph",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MalformedHistory => {
                Some("Supply commits newest-first, each hash once, never parenting itself.")
            }
            Self::IndexOutOfRange => None,
            Self::InvalidFragment => {
                Some("Relate the fragment again after the graph changed, then retry.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by graph construction, row access and fragment folding.
///
/// Every variant is a local failure of the single call that produced it;
/// the model is left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A commit lists its own hash among its parents.
    #[error("commit {hash} lists itself as a parent")]
    SelfParent {
        /// The offending commit.
        hash: Hash,
    },

    /// The same commit hash occurs twice in the input.
    #[error("commit {hash} appears at positions {first} and {second}")]
    DuplicateCommit {
        /// The repeated hash.
        hash: Hash,
        /// Position of the first occurrence.
        first: usize,
        /// Position of the repeated occurrence.
        second: usize,
    },

    /// A parent occurs earlier in the input than its child.
    #[error("commit {child} references parent {parent}, which precedes it in the input")]
    ParentBeforeChild {
        /// The child commit.
        child: Hash,
        /// The parent that was listed too early.
        parent: Hash,
    },

    /// A row index past the end of a list.
    #[error("row {index} out of range (len {len})")]
    IndexOutOfRange {
        /// The requested row.
        index: usize,
        /// Current logical length.
        len: usize,
    },

    /// An update request that does not fit the list it was applied to.
    #[error("update request {from}..{to} ({added:+}) does not fit a list of {len} rows")]
    InvalidUpdateRequest {
        /// First invalidated row.
        from: usize,
        /// End (exclusive) of the invalidated rows.
        to: usize,
        /// Row count delta.
        added: isize,
        /// Length of the list the request was applied to.
        len: usize,
    },

    /// A node or edge id that this graph never issued.
    #[error("unknown graph element {0}")]
    UnknownElement(String),

    /// A fragment whose endpoints no longer match the current graph.
    #[error("fragment {up}..{down} is stale: {reason}")]
    InvalidFragment {
        /// Upper endpoint.
        up: Hash,
        /// Lower endpoint.
        down: Hash,
        /// What no longer matches.
        reason: &'static str,
    },
}

impl GraphError {
    /// Return the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SelfParent { .. }
            | Self::DuplicateCommit { .. }
            | Self::ParentBeforeChild { .. } => ErrorCode::MalformedHistory,
            Self::IndexOutOfRange { .. }
            | Self::InvalidUpdateRequest { .. }
            | Self::UnknownElement(_) => ErrorCode::IndexOutOfRange,
            Self::InvalidFragment { .. } => ErrorCode::InvalidFragment,
        }
    }
}
