//! Counterexample replay and seeded simulation for Faultline.
//!
//! A [`Simulator`] re-executes a model along a recorded trace, so any state
//! of a counterexample can be inspected by moving forward and backward
//! through it. Replays are checked: every transition must make exactly the
//! recorded choices and reproduce the recorded state.
//!
//! # Example
//!
//! ```rust,ignore
//! use faultline_sim::Simulator;
//!
//! let mut sim = Simulator::from_counterexample(model, counterexample)?;
//! sim.fast_forward(10)?;
//! sim.rewind(3)?;
//! println!("{:?}", sim.state());
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod simulator;

pub use error::{Error, Result};
pub use simulator::Simulator;
