// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Store error kinds.
use weft_hash::HashError;

/// Errors produced by the store.
///
/// Absence of a pattern match is not an error: pattern and template queries
/// return empty sets instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The named atom does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Build-time validation rejected the atom.
    #[error("invalid atom: {0}")]
    InvalidAtom(String),
    /// A hashing precondition was violated.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The operation exists in the contract but this store does not provide
    /// it.
    #[error("not supported: {0}")]
    NotSupported(&'static str),
}

impl From<HashError> for StoreError {
    fn from(err: HashError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
