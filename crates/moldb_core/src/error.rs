//! Error types for the store.

use crate::types::{AtomId, BondId, MoleculeId};
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation invoked on a session context whose transaction is gone,
    /// typically after a failed commit.
    #[error("no active session transaction")]
    NotReady,

    /// A session transaction is already open. The engine allows a single
    /// concurrent writer, so a second one would block forever.
    #[error("a session transaction is already active")]
    TransactionActive,

    /// The storage engine returned a non-success status. Carries the
    /// engine's diagnostic text; never retried internally.
    #[error("engine error: {0}")]
    Engine(#[from] heed3::Error),

    /// Record encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] moldb_codec::CodecError),

    /// I/O error outside the engine (directory creation and the like).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No descriptor exists for the molecule.
    #[error("molecule not found: {0}")]
    MoleculeNotFound(MoleculeId),

    /// No record exists for the atom in its molecule.
    #[error("atom not found: {atom} in molecule {molecule}")]
    AtomNotFound {
        /// The owning molecule.
        molecule: MoleculeId,
        /// The atom id that was not found.
        atom: AtomId,
    },

    /// No record exists for the bond in its molecule.
    #[error("bond not found: {bond} in molecule {molecule}")]
    BondNotFound {
        /// The owning molecule.
        molecule: MoleculeId,
        /// The bond id that was not found.
        bond: BondId,
    },

    /// Internal consistency bug, e.g. an atom referencing a bond that is
    /// staged for removal. Surfaced loudly instead of masked by filtering.
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },
}

impl StoreError {
    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }
}
