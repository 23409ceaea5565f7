//! Fault model boundary types for Faultline.
//!
//! This crate provides:
//! - The `Model` trait every analyzable system implements
//! - The `Choose` seam through which models request choices
//! - Explicit fault registration with activation modes
//! - Dynamic fault sets with cheap subset/superset algebra
//! - Priority-ordered fault effect tables
//! - Serialized model snapshots that can be re-instantiated per fault assignment
//!
//! # Example
//!
//! ```rust,ignore
//! use faultline_model::{fixtures::RedundantPumpModel, ModelSnapshot, ActivationMode, FaultSet};
//!
//! let model = RedundantPumpModel::new();
//! let snapshot = ModelSnapshot::capture(&model)?;
//! let variant: RedundantPumpModel =
//!     snapshot.instantiate(&FaultSet::empty(), ActivationMode::Nondeterministic)?;
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod effect;
pub mod error;
pub mod fault;
pub mod fault_set;
pub mod fixtures;
pub mod model;
pub mod probability;
pub mod snapshot;

pub use effect::{Effect, EffectTable};
pub use error::{Error, Result};
pub use fault::{ActivationMode, Fault, FaultId, Faults};
pub use fault_set::FaultSet;
pub use model::{Choose, Model};
pub use probability::Probability;
pub use snapshot::ModelSnapshot;
