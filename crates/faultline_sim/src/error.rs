//! Error types for simulation and replay.

use thiserror::Error;

/// Errors that can occur while replaying or simulating a model.
#[derive(Debug, Error)]
pub enum Error {
    /// Replaying transition `step` did not reproduce the recorded state.
    ///
    /// Step 0 refers to the construction state.
    #[error("replay diverged from the recorded trace at step {step}")]
    ReplayDiverged {
        /// Step whose state differs.
        step: usize,
    },

    /// The trace was recorded for a different model.
    #[error("trace was recorded for model '{recorded}', not '{model}'")]
    ModelMismatch {
        /// Model name stored in the trace.
        recorded: String,
        /// Name of the model replaying it.
        model: String,
    },

    /// Exploration error.
    #[error(transparent)]
    Check(#[from] faultline_mc::Error),
}

/// Result type alias for simulation.
pub type Result<T> = std::result::Result<T, Error>;
