//! Error types for the Quire engine.

use crate::{DocumentId, Seq, SiteId};
use thiserror::Error;

/// All possible errors from the Quire engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    // Reconciliation errors
    #[error("corrupted operation at index {index} (site {site}, seq {seq}): {reason}")]
    CorruptedOperation {
        /// Position of the failing operation in the submitted batch
        index: usize,
        site: SiteId,
        seq: Seq,
        /// Operations of the batch committed before the failure
        committed: usize,
        reason: String,
    },

    // Edit errors
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("edit ends at {end}, past document length {len}")]
    OutOfBounds { end: usize, len: usize },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    // State errors
    #[error("inconsistent record: {0}")]
    InconsistentRecord(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
