//! Explicit fault registration.
//!
//! Every model owns a [`Faults`] registry. Faults are registered once, in a
//! fixed order, and addressed by their [`FaultId`] afterwards. The id of a
//! fault is its registration index, which is what the fault-set bit
//! positions refer to.

use crate::error::{Error, Result};
use crate::fault_set::FaultSet;
use crate::model::Choose;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Stable identifier of a registered fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultId(usize);

impl FaultId {
    /// Creates an id from a registration index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the registration index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a fault is activated while a model is explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    /// Active in every step.
    Forced,
    /// Never active.
    Suppressed,
    /// The checker decides in every step whether the fault is active.
    #[default]
    Nondeterministic,
}

impl fmt::Display for ActivationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => write!(f, "forced"),
            Self::Suppressed => write!(f, "suppressed"),
            Self::Nondeterministic => write!(f, "nondeterministic"),
        }
    }
}

/// A single registered fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Human-readable fault name, unique within a model.
    pub name: String,
    /// Current activation mode.
    pub mode: ActivationMode,
}

/// The fault registry of a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faults {
    faults: Vec<Fault>,
}

impl Faults {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { faults: Vec::new() }
    }

    /// Registers a fault and returns its id.
    pub fn register(&mut self, name: impl Into<String>, mode: ActivationMode) -> FaultId {
        let id = FaultId::new(self.faults.len());
        self.faults.push(Fault {
            name: name.into(),
            mode,
        });
        id
    }

    /// Returns the number of registered faults.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faults.len()
    }

    /// Returns true if no fault is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Returns the fault registered under `id`.
    #[must_use]
    pub fn get(&self, id: FaultId) -> Option<&Fault> {
        self.faults.get(id.index())
    }

    /// Looks a fault up by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<FaultId> {
        self.faults
            .iter()
            .position(|f| f.name == name)
            .map(FaultId::new)
    }

    /// Iterates over all faults with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (FaultId, &Fault)> {
        self.faults
            .iter()
            .enumerate()
            .map(|(i, f)| (FaultId::new(i), f))
    }

    /// Returns the ids of all faults currently in the given mode.
    #[must_use]
    pub fn with_mode(&self, mode: ActivationMode) -> FaultSet {
        self.iter()
            .filter(|(_, f)| f.mode == mode)
            .map(|(id, _)| id)
            .collect()
    }

    /// Changes the activation mode of a single fault.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFault` if `id` is not registered.
    pub fn set_mode(&mut self, id: FaultId, mode: ActivationMode) -> Result<()> {
        let fault = self
            .faults
            .get_mut(id.index())
            .ok_or_else(|| Error::UnknownFault(id.to_string()))?;
        fault.mode = mode;
        Ok(())
    }

    /// Activates every fault in `active` with `mode` and suppresses all others.
    pub fn assign(&mut self, active: &FaultSet, mode: ActivationMode) {
        for (index, fault) in self.faults.iter_mut().enumerate() {
            fault.mode = if active.contains(FaultId::new(index)) {
                mode
            } else {
                ActivationMode::Suppressed
            };
        }
    }

    /// Checks that fault names are unique.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateFault` naming the first repeated fault.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for fault in &self.faults {
            if !seen.insert(fault.name.as_str()) {
                return Err(Error::DuplicateFault(fault.name.clone()));
            }
        }
        Ok(())
    }

    /// Resolves which faults are active in the current step.
    ///
    /// Forced faults are always active and suppressed faults never are. Every
    /// nondeterministic fault costs one two-way choice, option 1 meaning
    /// "activated".
    pub fn activation(&self, choices: &mut dyn Choose) -> FaultSet {
        let mut active = FaultSet::empty();
        for (id, fault) in self.iter() {
            let on = match fault.mode {
                ActivationMode::Forced => true,
                ActivationMode::Suppressed => false,
                ActivationMode::Nondeterministic => choices.choose(2) == 1,
            };
            if on {
                active.insert(id);
            }
        }
        active
    }

    /// Renders a fault set using fault names, e.g. `{pump_a, pump_b}`.
    #[must_use]
    pub fn describe(&self, set: &FaultSet) -> String {
        let names: Vec<String> = set
            .iter()
            .map(|id| {
                self.get(id)
                    .map_or_else(|| id.to_string(), |f| f.name.clone())
            })
            .collect();
        format!("{{{}}}", names.join(", "))
    }
}
