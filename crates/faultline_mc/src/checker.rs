//! Depth-first invariant checking.

use crate::counterexample::Counterexample;
use crate::error::{Error, Resource, Result};
use crate::resolver::ChoiceResolver;
use faultline_model::Model;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use xxhash_rust::xxh64::Xxh64;

/// Configuration for the invariant checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Maximum number of distinct states.
    pub state_capacity: usize,
    /// Maximum depth of the exploration stack.
    pub stack_capacity: usize,
    /// Whether a violation records its trace.
    pub generate_counterexample: bool,
    /// Wall-clock budget, checked between states.
    pub time_limit: Option<Duration>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            state_capacity: 1 << 20,
            stack_capacity: 1 << 16,
            generate_counterexample: true,
            time_limit: None,
        }
    }
}

impl CheckerConfig {
    /// Sets the state capacity.
    #[must_use]
    pub const fn with_state_capacity(mut self, capacity: usize) -> Self {
        self.state_capacity = capacity;
        self
    }

    /// Sets the stack capacity.
    #[must_use]
    pub const fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    /// Enables or disables counterexample generation.
    #[must_use]
    pub const fn with_counterexample(mut self, enabled: bool) -> Self {
        self.generate_counterexample = enabled;
        self
    }

    /// Sets the time limit.
    #[must_use]
    pub const fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Exploration statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckStats {
    /// Distinct states reached, excluding the construction state.
    pub states: usize,
    /// Transitions taken, including those into known states.
    pub transitions: usize,
    /// Deepest stack depth reached.
    pub max_depth: usize,
    /// Time spent exploring.
    pub elapsed: Duration,
}

/// Verdict of an invariant check.
#[derive(Debug, Clone)]
pub enum CheckOutcome<S> {
    /// The invariant holds in every reachable state.
    Holds {
        /// Exploration statistics.
        stats: CheckStats,
    },
    /// Some reachable state violates the invariant.
    Violated {
        /// Trace to the violating state, if generation was enabled.
        counterexample: Option<Counterexample<S>>,
        /// Exploration statistics.
        stats: CheckStats,
    },
}

impl<S> CheckOutcome<S> {
    /// Returns true if the invariant was violated.
    pub const fn is_violated(&self) -> bool {
        matches!(self, Self::Violated { .. })
    }

    /// Exploration statistics.
    pub const fn stats(&self) -> &CheckStats {
        match self {
            Self::Holds { stats } | Self::Violated { stats, .. } => stats,
        }
    }

    /// The counterexample, if any.
    pub const fn counterexample(&self) -> Option<&Counterexample<S>> {
        match self {
            Self::Violated {
                counterexample: Some(cx),
                ..
            } => Some(cx),
            _ => None,
        }
    }

    /// Consumes the outcome and returns the counterexample, if any.
    pub fn into_counterexample(self) -> Option<Counterexample<S>> {
        match self {
            Self::Violated { counterexample, .. } => counterexample,
            Self::Holds { .. } => None,
        }
    }
}

/// xxh64 fingerprint of a state.
pub fn fingerprint<S: Hash + ?Sized>(state: &S) -> u64 {
    let mut hasher = Xxh64::new(0);
    state.hash(&mut hasher);
    hasher.finish()
}

/// A reached state and how it was reached.
struct Entry<S> {
    state: S,
    parent: Option<usize>,
    choices: Vec<usize>,
}

/// A state on the exploration stack and its unexplored successors.
struct Frame<S> {
    entry: usize,
    successors: std::vec::IntoIter<(Vec<usize>, S)>,
}

/// Explicit-state invariant checker.
#[derive(Debug, Clone, Default)]
pub struct InvariantChecker {
    config: CheckerConfig,
}

impl InvariantChecker {
    /// Creates a checker with the given configuration.
    #[must_use]
    pub const fn new(config: CheckerConfig) -> Self {
        Self { config }
    }

    /// The checker's configuration.
    #[must_use]
    pub const fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Checks that `invariant` holds in every state reachable in `model`.
    ///
    /// Exploration starts at the construction state, whose successors are
    /// produced by [`Model::initialize`]; all other successors come from
    /// [`Model::step`]. The construction state itself is not checked.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapacityExceeded` when a capacity or the time limit
    /// is exhausted and `Error::Nondeterminism` when the model does not
    /// replay its choices consistently.
    pub fn check_invariant<M, F>(&self, model: &M, invariant: F) -> Result<CheckOutcome<M::State>>
    where
        M: Model,
        F: Fn(&M::State) -> bool,
    {
        let start = Instant::now();
        let mut stats = CheckStats::default();
        let mut resolver = ChoiceResolver::new();

        debug!(
            model = model.name(),
            state_capacity = self.config.state_capacity,
            stack_capacity = self.config.stack_capacity,
            "Starting invariant check"
        );

        let construction = model.construction_state();
        let initial = successors(&mut resolver, |r| model.initialize(&construction, r))?;
        let mut entries = vec![Entry {
            state: construction,
            parent: None,
            choices: Vec::new(),
        }];
        let mut visited: HashMap<u64, Vec<usize>> = HashMap::new();
        let mut stack = vec![Frame {
            entry: 0,
            successors: initial.into_iter(),
        }];
        stats.max_depth = 1;

        while let Some(frame) = stack.last_mut() {
            let Some((choices, successor)) = frame.successors.next() else {
                stack.pop();
                continue;
            };
            let parent = frame.entry;
            stats.transitions += 1;

            let hash = fingerprint(&successor);
            let bucket = visited.entry(hash).or_default();
            if bucket.iter().any(|&i| entries[i].state == successor) {
                continue;
            }

            stats.states += 1;
            if stats.states > self.config.state_capacity {
                return Err(capacity(Resource::States, self.config.state_capacity));
            }
            if let Some(limit) = self.config.time_limit {
                if start.elapsed() >= limit {
                    return Err(Error::CapacityExceeded {
                        resource: Resource::Time,
                        limit: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            }

            let index = entries.len();
            bucket.push(index);
            let violated = !invariant(&successor);
            let next = if violated {
                Vec::new()
            } else {
                successors(&mut resolver, |r| model.step(&successor, r))?
            };
            entries.push(Entry {
                state: successor,
                parent: Some(parent),
                choices,
            });

            if violated {
                stats.elapsed = start.elapsed();
                info!(
                    model = model.name(),
                    states = stats.states,
                    depth = stack.len(),
                    "Invariant violated"
                );
                let counterexample = self
                    .config
                    .generate_counterexample
                    .then(|| trace(model.name(), &entries, index));
                return Ok(CheckOutcome::Violated {
                    counterexample,
                    stats,
                });
            }

            stack.push(Frame {
                entry: index,
                successors: next.into_iter(),
            });
            if stack.len() > self.config.stack_capacity {
                return Err(capacity(Resource::Stack, self.config.stack_capacity));
            }
            stats.max_depth = stats.max_depth.max(stack.len());
        }

        stats.elapsed = start.elapsed();
        info!(
            model = model.name(),
            states = stats.states,
            transitions = stats.transitions,
            "Invariant holds"
        );
        Ok(CheckOutcome::Holds { stats })
    }
}

fn capacity(resource: Resource, limit: usize) -> Error {
    Error::CapacityExceeded {
        resource,
        limit: u64::try_from(limit).unwrap_or(u64::MAX),
    }
}

/// Enumerates every successor of one state together with the choices producing it.
fn successors<S>(
    resolver: &mut ChoiceResolver,
    mut transition: impl FnMut(&mut ChoiceResolver) -> S,
) -> Result<Vec<(Vec<usize>, S)>> {
    let mut out = Vec::new();
    resolver.prepare_next_state();
    while resolver.prepare_next_path()? {
        let state = transition(resolver);
        out.push((resolver.choices(), state));
    }
    Ok(out)
}

/// Rebuilds the path from the construction state to `index`.
fn trace<S: Clone>(model: &str, entries: &[Entry<S>], index: usize) -> Counterexample<S> {
    let mut path = Vec::new();
    let mut cursor = Some(index);
    while let Some(i) = cursor {
        let entry = &entries[i];
        if entry.parent.is_some() {
            path.push(i);
        }
        cursor = entry.parent;
    }

    let mut counterexample = Counterexample::new(model, entries[0].state.clone());
    for &i in path.iter().rev() {
        counterexample.push(entries[i].choices.clone(), entries[i].state.clone());
    }
    counterexample
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_model::fixtures::{
        CoinModel, CounterModel, PumpState, RedundantPumpModel, TankModel,
    };
    use faultline_model::{ActivationMode, FaultSet};

    #[test]
    fn counter_reaches_42_after_41_steps() {
        let checker = InvariantChecker::default();
        let outcome = checker
            .check_invariant(&CounterModel::new(2), |s| s.x != 42)
            .unwrap();

        let cx = outcome.counterexample().unwrap();
        assert_eq!(cx.step_count(), 41);
        assert_eq!(cx.states()[0].x, 2);
        assert_eq!(cx.states()[1].x, 2);
        assert_eq!(cx.states().last().unwrap().x, 42);
        assert!(cx.choices().iter().all(Vec::is_empty));
    }

    #[test]
    fn unbounded_counter_exhausts_state_capacity() {
        let checker = InvariantChecker::new(CheckerConfig::default().with_state_capacity(100));
        let err = checker
            .check_invariant(&CounterModel::new(0), |_| true)
            .unwrap_err();
        assert!(err.is_resource_exhaustion());
        assert!(matches!(
            err,
            Error::CapacityExceeded {
                resource: Resource::States,
                limit: 100
            }
        ));
    }

    #[test]
    fn zero_time_limit_is_exhausted_at_first_state() {
        let checker =
            InvariantChecker::new(CheckerConfig::default().with_time_limit(Duration::ZERO));
        let err = checker
            .check_invariant(&CounterModel::new(0), |_| true)
            .unwrap_err();
        assert!(err.is_resource_exhaustion());
        assert!(matches!(
            err,
            Error::CapacityExceeded {
                resource: Resource::Time,
                limit: 0
            }
        ));
    }

    #[test]
    fn deep_counter_exhausts_stack_capacity() {
        let config = CheckerConfig::default()
            .with_state_capacity(1000)
            .with_stack_capacity(10);
        let err = InvariantChecker::new(config)
            .check_invariant(&CounterModel::new(0), |_| true)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CapacityExceeded {
                resource: Resource::Stack,
                ..
            }
        ));
    }

    #[test]
    fn pumps_are_safe_with_one_fault() {
        let mut model = RedundantPumpModel::new();
        model
            .faults_mut()
            .assign(&FaultSet::singleton(RedundantPumpModel::PUMP_A), ActivationMode::Forced);
        let outcome = InvariantChecker::default()
            .check_invariant(&model, |s: &PumpState| !s.no_pump_running())
            .unwrap();
        assert!(!outcome.is_violated());
        assert!(outcome.stats().states >= 1);
    }

    #[test]
    fn pumps_fail_with_both_faults() {
        let mut model = RedundantPumpModel::new();
        let both: FaultSet = [RedundantPumpModel::PUMP_A, RedundantPumpModel::PUMP_B]
            .into_iter()
            .collect();
        model
            .faults_mut()
            .assign(&both, ActivationMode::Nondeterministic);
        let outcome = InvariantChecker::default()
            .check_invariant(&model, |s: &PumpState| !s.no_pump_running())
            .unwrap();
        let cx = outcome.counterexample().unwrap();
        assert!(cx.states().last().unwrap().no_pump_running());
        assert_eq!(cx.choices().len(), cx.step_count());
    }

    #[test]
    fn counterexample_generation_can_be_disabled() {
        let checker = InvariantChecker::new(CheckerConfig::default().with_counterexample(false));
        let outcome = checker
            .check_invariant(&CounterModel::new(0), |s| s.x < 3)
            .unwrap();
        assert!(outcome.is_violated());
        assert!(outcome.into_counterexample().is_none());
    }

    #[test]
    fn nominal_tank_holds() {
        let mut model = TankModel::new();
        model
            .faults_mut()
            .assign(&FaultSet::empty(), ActivationMode::Forced);
        let outcome = InvariantChecker::default()
            .check_invariant(&model, |s| !s.overflowed())
            .unwrap();
        assert!(!outcome.is_violated());
    }

    #[test]
    fn stuck_valve_overflows_tank() {
        let mut model = TankModel::new();
        model
            .faults_mut()
            .assign(&FaultSet::singleton(TankModel::VALVE_STUCK), ActivationMode::Forced);
        let outcome = InvariantChecker::default()
            .check_invariant(&model, |s| !s.overflowed())
            .unwrap();
        let cx = outcome.counterexample().unwrap();
        assert_eq!(cx.states().last().unwrap().level, TankModel::OVERFLOW);
    }

    #[test]
    fn coin_explores_probabilistic_branches() {
        let outcome = InvariantChecker::default()
            .check_invariant(&CoinModel::new(3), |s| s.flips < 3)
            .unwrap();
        let cx = outcome.counterexample().unwrap();
        assert_eq!(cx.states().last().unwrap().flips, 3);
    }

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(fingerprint(&PumpState::default()), fingerprint(&PumpState::default()));
        assert_ne!(
            fingerprint(&PumpState::default()),
            fingerprint(&PumpState {
                sensor_failed: true,
                ..PumpState::default()
            })
        );
    }
}
