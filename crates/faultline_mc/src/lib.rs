//! Explicit-state exploration engine for Faultline.
//!
//! This crate provides:
//! - A choice resolver that enumerates every resolution of the choices a
//!   model makes while computing one state's successors
//! - Continuation graphs and their flattening into successor distributions
//! - Depth-first invariant checking with state and stack capacities
//! - Restartable counterexamples with lossless persistence
//! - Markov chain / decision process construction with bounded reachability
//!
//! # Example
//!
//! ```rust,ignore
//! use faultline_mc::{CheckerConfig, InvariantChecker};
//! use faultline_model::fixtures::CounterModel;
//!
//! let checker = InvariantChecker::new(CheckerConfig::default());
//! let outcome = checker.check_invariant(&CounterModel::new(2), |s| s.x < 42)?;
//! assert!(outcome.is_violated());
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod checker;
pub mod counterexample;
pub mod distribution;
pub mod error;
pub mod graph;
pub mod markov;
pub mod resolver;

pub use checker::{fingerprint, CheckOutcome, CheckStats, CheckerConfig, InvariantChecker};
pub use counterexample::{Counterexample, COUNTEREXAMPLE_EXTENSION};
pub use distribution::{ContinuationDistributionMapper, Distribution, Split, SplitKind};
pub use error::{Error, Resource, Result};
pub use graph::{ChoiceKind, ChoiceNode, ContinuationGraph};
pub use markov::{Extremum, MarkovBuilder, MarkovModel};
pub use resolver::{ChoiceResolver, ChosenValue};
