//! Error types for exploration.

use std::fmt;
use thiserror::Error;

/// Resource bounded by a checker capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Number of distinct states.
    States,
    /// Depth of the exploration stack.
    Stack,
    /// Wall-clock time in milliseconds.
    Time,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::States => write!(f, "state capacity"),
            Self::Stack => write!(f, "stack capacity"),
            Self::Time => write!(f, "time limit (ms)"),
        }
    }
}

/// Errors that can occur while exploring a model.
#[derive(Debug, Error)]
pub enum Error {
    /// The number of choices handled on a path does not match the resolver stack.
    ///
    /// The model made a different number of choices when replaying a path
    /// prefix, or a caller did not finish a path before advancing.
    #[error("nondeterminism detected: {handled} choices handled but {depth} on the stack")]
    Nondeterminism {
        /// Choices handled on the current path.
        handled: usize,
        /// Depth of the choice stack.
        depth: usize,
    },

    /// Only a choice whose first option is selected can be forwarded.
    #[error("cannot forward choice {index}: option {option} is selected instead of 0")]
    InvalidForward {
        /// Choice index.
        index: usize,
        /// Currently selected option.
        option: usize,
    },

    /// A choice index beyond the current path was addressed.
    #[error("no choice at index {index} (path depth {depth})")]
    NoSuchChoice {
        /// Requested index.
        index: usize,
        /// Current depth.
        depth: usize,
    },

    /// A continuation graph with cycles or dangling child ids.
    #[error("malformed continuation graph: {0}")]
    MalformedGraph(String),

    /// An exploration exceeded one of its capacities.
    #[error("{resource} of {limit} exceeded")]
    CapacityExceeded {
        /// Exhausted resource.
        resource: Resource,
        /// Configured limit.
        limit: u64,
    },

    /// A persisted counterexample failed validation.
    #[error("corrupt counterexample: {0}")]
    CorruptCounterexample(String),

    /// Model layer error.
    #[error(transparent)]
    Model(#[from] faultline_model::Error),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for capacity and time limit failures.
    #[must_use]
    pub const fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}

/// Result type alias for exploration.
pub type Result<T> = std::result::Result<T, Error>;
