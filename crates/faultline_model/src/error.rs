//! Error types for model operations.

use thiserror::Error;

/// Errors that can occur while building or instantiating models.
#[derive(Debug, Error)]
pub enum Error {
    /// Probability outside of `[0, 1]` or not finite.
    #[error("invalid probability: {0}")]
    InvalidProbability(f64),

    /// Two faults were registered under the same name.
    #[error("duplicate fault: {0}")]
    DuplicateFault(String),

    /// A fault id or name does not belong to the model.
    #[error("unknown fault: {0}")]
    UnknownFault(String),

    /// Snapshot could not be written or read back.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;
