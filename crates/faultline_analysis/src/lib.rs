//! Minimal critical fault set search for Faultline.
//!
//! Given a model with registered faults and a hazard predicate, the
//! analysis finds every minimal set of faults whose activation makes the
//! hazard reachable.
//!
//! # Search
//!
//! - **Level 0**: the empty set, plus faults the model forces
//! - **Level k**: every safe set of level k-1 extended by one fault,
//!   minus supersets of known cut sets
//! - **Checks**: one invariant check per candidate, candidates of a level
//!   in parallel
//!
//! # Example
//!
//! ```rust,ignore
//! use faultline_analysis::{AnalysisConfig, SafetyAnalysis};
//! use faultline_model::fixtures::{PumpState, RedundantPumpModel};
//!
//! let analysis = SafetyAnalysis::new(AnalysisConfig::default());
//! let result = analysis.compute_minimal_critical_sets(
//!     &RedundantPumpModel::new(),
//!     PumpState::no_pump_running,
//! )?;
//! println!("{result}");
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod result;

pub use analysis::SafetyAnalysis;
pub use config::{AnalysisConfig, FaultActivationBehavior};
pub use error::{Error, Result};
pub use result::{AnalysisResult, Inconclusive, LevelStats};
