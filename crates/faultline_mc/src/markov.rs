//! Explicit Markov chain and decision process construction.
//!
//! Every state's successors are enumerated with a [`ChoiceResolver`]; the
//! resulting continuation graph is flattened by the
//! [`ContinuationDistributionMapper`]. A state whose graph contains no
//! nondeterministic split has a single distribution, so models without
//! nondeterminism produce a DTMC.

use crate::distribution::ContinuationDistributionMapper;
use crate::error::{Error, Resource, Result};
use crate::resolver::ChoiceResolver;
use faultline_model::{Model, Probability};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Distribution over state indices.
pub type Transition = Vec<(usize, Probability)>;

/// Scheduler objective for nondeterministic choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    /// Adversarial scheduler.
    Min,
    /// Cooperative scheduler.
    Max,
}

/// An explicit MDP; a DTMC if every state has exactly one action.
#[derive(Debug, Clone)]
pub struct MarkovModel<S> {
    states: Vec<S>,
    initial: Vec<Transition>,
    transitions: Vec<Vec<Transition>>,
}

impl<S> MarkovModel<S> {
    /// Reachable states.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Initial distributions, one per resolution of the initialization.
    pub fn initial(&self) -> &[Transition] {
        &self.initial
    }

    /// Actions of state `index`.
    pub fn actions(&self, index: usize) -> &[Transition] {
        self.transitions.get(index).map_or(&[], Vec::as_slice)
    }

    /// Returns true if no state offers a choice of actions.
    pub fn is_dtmc(&self) -> bool {
        self.initial.len() == 1 && self.transitions.iter().all(|a| a.len() == 1)
    }

    /// Probability of reaching a `target` state within `steps` transitions
    /// after initialization, under the best or worst scheduler.
    pub fn bounded_reachability(
        &self,
        target: impl Fn(&S) -> bool,
        steps: usize,
        extremum: Extremum,
    ) -> Probability {
        let hit: Vec<bool> = self.states.iter().map(&target).collect();
        let mut values: Vec<f64> = hit.iter().map(|&h| if h { 1.0 } else { 0.0 }).collect();

        for _ in 0..steps {
            values = self
                .transitions
                .iter()
                .enumerate()
                .map(|(index, actions)| {
                    if hit[index] {
                        1.0
                    } else {
                        optimize(actions, &values, extremum)
                    }
                })
                .collect();
        }

        Probability::new(optimize(&self.initial, &values, extremum).clamp(0.0, 1.0))
            .unwrap_or(Probability::ONE)
    }
}

fn expectation(transition: &Transition, values: &[f64]) -> f64 {
    transition
        .iter()
        .map(|(target, p)| p.value() * values.get(*target).copied().unwrap_or(0.0))
        .sum()
}

fn optimize(actions: &[Transition], values: &[f64], extremum: Extremum) -> f64 {
    let expectations = actions.iter().map(|t| expectation(t, values));
    match extremum {
        Extremum::Max => expectations.fold(0.0, f64::max),
        Extremum::Min => expectations.reduce(f64::min).unwrap_or(0.0),
    }
}

/// Builds explicit Markov models by breadth-first exploration.
#[derive(Debug, Clone, Copy)]
pub struct MarkovBuilder {
    state_capacity: usize,
}

impl Default for MarkovBuilder {
    fn default() -> Self {
        Self::new(1 << 20)
    }
}

impl MarkovBuilder {
    /// Creates a builder bounded to `state_capacity` states.
    #[must_use]
    pub const fn new(state_capacity: usize) -> Self {
        Self { state_capacity }
    }

    /// Explores `model` and returns its explicit Markov model.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapacityExceeded` if the model has more reachable
    /// states than allowed, and resolver or mapper errors for models that
    /// do not replay their choices consistently.
    pub fn build<M: Model>(&self, model: &M) -> Result<MarkovModel<M::State>> {
        let mut resolver = ChoiceResolver::new();
        let mut mapper = ContinuationDistributionMapper::new();
        let mut index: HashMap<M::State, usize> = HashMap::new();
        let mut states: Vec<M::State> = Vec::new();
        let mut transitions: Vec<Vec<Transition>> = Vec::new();
        let mut queue = VecDeque::new();

        let construction = model.construction_state();
        let initial = self.expand(
            &mut resolver,
            &mut mapper,
            |r| model.initialize(&construction, r),
            &mut index,
            &mut states,
            &mut queue,
        )?;

        while let Some(current) = queue.pop_front() {
            let state: M::State = states[current].clone();
            let actions = self.expand(
                &mut resolver,
                &mut mapper,
                |r| model.step(&state, r),
                &mut index,
                &mut states,
                &mut queue,
            )?;
            // States are dequeued in index order.
            transitions.push(actions);
        }

        debug!(
            model = model.name(),
            states = states.len(),
            "Built Markov model"
        );
        Ok(MarkovModel {
            states,
            initial,
            transitions,
        })
    }

    fn expand<S: Clone + Eq + std::hash::Hash>(
        &self,
        resolver: &mut ChoiceResolver,
        mapper: &mut ContinuationDistributionMapper,
        mut transition: impl FnMut(&mut ChoiceResolver) -> S,
        index: &mut HashMap<S, usize>,
        states: &mut Vec<S>,
        queue: &mut VecDeque<usize>,
    ) -> Result<Vec<Transition>> {
        let mut leaves: HashMap<usize, usize> = HashMap::new();
        resolver.prepare_next_state();
        while resolver.prepare_next_path()? {
            let successor = transition(resolver);
            let target = if let Some(&known) = index.get(&successor) {
                known
            } else {
                let fresh = states.len();
                if fresh >= self.state_capacity {
                    return Err(Error::CapacityExceeded {
                        resource: Resource::States,
                        limit: u64::try_from(self.state_capacity).unwrap_or(u64::MAX),
                    });
                }
                index.insert(successor.clone(), fresh);
                states.push(successor);
                queue.push_back(fresh);
                fresh
            };
            leaves.insert(resolver.continuation_id(), target);
        }

        mapper.map(resolver.graph())?;
        let mut actions: Vec<Transition> = Vec::new();
        for distribution in mapper.distributions() {
            let mut merged: Transition = Vec::new();
            for (leaf, p) in distribution.iter() {
                let target = *leaves.get(&leaf).ok_or_else(|| {
                    Error::MalformedGraph(format!("leaf {leaf} was never reached"))
                })?;
                match merged.iter_mut().find(|(t, _)| *t == target) {
                    Some(entry) => entry.1 = entry.1 + p,
                    None => merged.push((target, p)),
                }
            }
            merged.sort_by_key(|(t, _)| *t);
            if !actions.contains(&merged) {
                actions.push(merged);
            }
        }
        Ok(actions)
    }
}
