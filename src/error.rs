//! Unified error handling for the activity engine.
//!
//! Expected conditions (unknown id, malformed import payload) are explicit
//! `Result` returns. Storage-medium faults are caught at the persistence
//! boundary, converted to `StorageUnavailable` and logged once; they never
//! propagate into aggregation logic.

use thiserror::Error;

/// Unified error type for store operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The persistence medium cannot be read or written. The store keeps
    /// working with in-memory state for the remainder of the session.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An update or removal referenced an id that is not in the collection.
    #[error("no activity with id '{id}'")]
    NotFound { id: String },

    /// An import payload was rejected wholesale.
    #[error("invalid import format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, EngineError>;
