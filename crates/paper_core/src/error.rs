//! crates/paper_core/src/error.rs
//!
//! Error types for model mutations, snapshot decoding and synchronization.
//! None of these are fatal: callers re-prompt, fall back to an empty
//! snapshot, or keep their local state and retry.

use crate::domain::DocumentKind;
use crate::ports::PortError;

/// Errors raised by the pure plan/schedule mutation operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("{what} index {index} is out of range (length {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate entry: {0}")]
    Duplicate(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// A convenience type alias for `Result<T, ModelError>`.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while decoding an encoded snapshot.
///
/// `MalformedInput` and `UnsupportedVersion` mean the string cannot be parsed;
/// `SchemaViolation` means it parsed but describes a state the model forbids.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("Schema violation: {0}")]
    SchemaViolation(String),
}

/// Errors surfaced by the synchronization coordinator.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The remote account store was unreachable or rejected the request.
    /// In-memory and local state are kept as they were.
    #[error("Sync failure: {0}")]
    SyncFailure(#[from] PortError),
    #[error("No active {0} to operate on")]
    NothingActive(DocumentKind),
}

impl SyncError {
    /// Returns true if retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::SyncFailure(PortError::Unexpected(_))
        )
    }
}
