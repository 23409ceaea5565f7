//! Error types for safety analysis.

use thiserror::Error;

/// Errors that can occur during a safety analysis.
#[derive(Debug, Error)]
pub enum Error {
    /// The model is not fit for analysis; nothing was checked.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Model layer error, e.g. a snapshot that does not restore.
    #[error(transparent)]
    Model(#[from] faultline_model::Error),

    /// Exploration error other than resource exhaustion.
    #[error(transparent)]
    Check(#[from] faultline_mc::Error),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// I/O error while persisting results.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for safety analysis.
pub type Result<T> = std::result::Result<T, Error>;
