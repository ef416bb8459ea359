//! Commit identity.
//!
//! A [`Hash`] is an opaque, fixed-capacity token compared by value. It holds
//! up to [`Hash::MAX_LEN`] bytes (a full SHA-1 object id) and is `Copy`, so
//! nodes and edges can carry it without touching the allocator. Text form is
//! lowercase hex with an even number of digits.
//!
//! A [`Commit`] pairs a hash with its parent hashes. Parent order is
//! significant (first-parent convention) and is preserved everywhere.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from decoding a textual hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashParseError {
    /// The input was empty.
    #[error("hash is empty")]
    Empty,

    /// More bytes than a [`Hash`] can hold.
    #[error("hash has {len} bytes, at most {max} are supported")]
    TooLong {
        /// Decoded length.
        len: usize,
        /// Capacity.
        max: usize,
    },

    /// Hex text with an odd number of digits.
    #[error("hash '{0}' has an odd number of hex digits")]
    OddLength(String),

    /// A character outside `[0-9a-fA-F]`.
    #[error("invalid hex digit {ch:?} at position {position}")]
    InvalidDigit {
        /// The offending character.
        ch: char,
        /// Byte offset in the input.
        position: usize,
    },
}

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// Opaque commit identity. The default is the empty hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash {
    bytes: [u8; Self::MAX_LEN],
    len: u8,
}

impl Hash {
    /// Largest supported hash, in bytes.
    pub const MAX_LEN: usize = 20;

    /// Build a hash from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HashParseError::Empty`] or [`HashParseError::TooLong`] when
    /// `bytes` does not fit.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashParseError> {
        if bytes.is_empty() {
            return Err(HashParseError::Empty);
        }
        let too_long = HashParseError::TooLong {
            len: bytes.len(),
            max: Self::MAX_LEN,
        };
        if bytes.len() > Self::MAX_LEN {
            return Err(too_long);
        }
        let len = u8::try_from(bytes.len()).map_err(|_| too_long)?;
        let mut buf = [0u8; Self::MAX_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { bytes: buf, len })
    }

    /// Decode a hash from hex text.
    ///
    /// # Errors
    ///
    /// Returns a [`HashParseError`] for empty, odd-length, oversized or
    /// non-hex input.
    pub fn from_hex(text: &str) -> Result<Self, HashParseError> {
        if text.is_empty() {
            return Err(HashParseError::Empty);
        }
        let bytes = hex::decode(text).map_err(|err| match err {
            hex::FromHexError::InvalidHexCharacter { c, index } => HashParseError::InvalidDigit {
                ch: c,
                position: index,
            },
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                HashParseError::OddLength(text.to_string())
            }
        })?;
        Self::from_bytes(&bytes)
    }

    /// The raw bytes of this hash.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// The first seven hex digits, or all of them for shorter hashes.
    #[must_use]
    pub fn short(&self) -> String {
        let mut full = self.to_string();
        full.truncate(7);
        full
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_bytes()))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({self})")
    }
}

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// One input record: a commit hash and its ordered parent hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Identity of this commit.
    pub hash: Hash,
    /// Parents, first parent first.
    pub parents: Vec<Hash>,
}

impl Commit {
    /// Create a commit record.
    #[must_use]
    pub const fn new(hash: Hash, parents: Vec<Hash>) -> Self {
        Self { hash, parents }
    }

    /// Parents with repeats removed, keeping first occurrences in order.
    #[must_use]
    pub fn distinct_parents(&self) -> Vec<Hash> {
        let mut out: Vec<Hash> = Vec::with_capacity(self.parents.len());
        for parent in &self.parents {
            if !out.contains(parent) {
                out.push(*parent);
            }
        }
        out
    }
}
