//! The model abstraction consumed by the checker and the safety analysis.

use crate::fault::Faults;
use crate::probability::Probability;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// Source of choices for a model computing a transition.
///
/// Models call these methods in the exact order their decisions occur. The
/// exploration engine answers with the option index to take; a simulator
/// may answer randomly or from a recorded trace.
pub trait Choose {
    /// Picks one of `count` options.
    fn choose(&mut self, count: usize) -> usize;

    /// Picks one option of a probabilistic branch.
    ///
    /// `probabilities` holds the branch probability of every option.
    fn choose_probabilistic(&mut self, probabilities: &[Probability]) -> usize;

    /// Two-way choice, `true` meaning option 1.
    fn choose_bool(&mut self) -> bool {
        self.choose(2) == 1
    }
}

/// A system that can be explored state by state.
///
/// Transitions are pure functions of the current state and the choices made
/// while computing them. Given the same choices, `initialize` and `step` must
/// return the same state; replay relies on this.
///
/// Safety analysis assumes monotonicity: activating additional faults never
/// makes a reachable hazard unreachable. The analysis does not verify this.
pub trait Model: Send + Sync {
    /// Explored state.
    type State: Clone + Eq + Hash + Debug + Send + Sync + Serialize + DeserializeOwned;

    /// Model name, used in logs and saved counterexamples.
    fn name(&self) -> &str;

    /// Registered faults.
    fn faults(&self) -> &Faults;

    /// Mutable access to the fault registry, used to change activation modes.
    fn faults_mut(&mut self) -> &mut Faults;

    /// State before the initialization transition runs.
    fn construction_state(&self) -> Self::State;

    /// Initialization transition, producing an initial state.
    fn initialize(&self, state: &Self::State, choices: &mut dyn Choose) -> Self::State {
        let _ = choices;
        state.clone()
    }

    /// Regular transition.
    fn step(&self, state: &Self::State, choices: &mut dyn Choose) -> Self::State;
}
