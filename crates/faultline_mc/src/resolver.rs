//! Choice resolution for one explored state.
//!
//! The resolver enumerates, one path at a time, every combination of the
//! choices a model makes while computing the successors of a single state.
//! Paths are visited in odometer order: the most recent choice varies
//! fastest. A typical driver looks like this:
//!
//! ```rust,ignore
//! resolver.prepare_next_state();
//! while resolver.prepare_next_path()? {
//!     let successor = model.step(&state, &mut resolver);
//!     let probability = resolver.calculate_probability_of_path();
//!     // ...
//! }
//! ```
//!
//! Each frame on the choice stack stores the option taken, the probability
//! of that option, the cumulative probability of the path up to and
//! including that choice, and the continuation id the choice leads to.

use crate::error::{Error, Result};
use crate::graph::{ChoiceKind, ContinuationGraph};
use faultline_model::{Choose, Probability};

/// A choice taken on the current path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChosenValue {
    /// Selected option.
    pub option: usize,
    /// Cumulative probability of the path up to and including this choice.
    pub probability: Probability,
    /// Probability of the selected option relative to its parent.
    pub branch: Probability,
    /// Continuation this choice leads to.
    pub continuation: usize,
    /// Probability folded by forwarding; replays must not overwrite it.
    locked: bool,
}

impl ChosenValue {
    fn new(option: usize, parent: Probability, branch: Probability, continuation: usize) -> Self {
        Self {
            option,
            probability: parent * branch,
            branch,
            continuation,
            locked: false,
        }
    }
}

/// Stack machine enumerating choice combinations.
///
/// `chosen` and `value_counts` are parallel stacks: entry `i` describes the
/// `i`-th choice on the current path. A value count of 0 marks a choice whose
/// remaining options must not be explored.
#[derive(Debug, Clone)]
pub struct ChoiceResolver {
    chosen: Vec<ChosenValue>,
    value_counts: Vec<usize>,
    handled: usize,
    first_path: bool,
    graph: ContinuationGraph,
}

impl Default for ChoiceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ChoiceResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chosen: Vec::new(),
            value_counts: Vec::new(),
            handled: 0,
            first_path: false,
            graph: ContinuationGraph::new(),
        }
    }

    /// Starts the enumeration of a new state's paths.
    pub fn prepare_next_state(&mut self) {
        self.chosen.clear();
        self.value_counts.clear();
        self.handled = 0;
        self.first_path = true;
        self.graph.clear();
    }

    /// Advances to the next unexplored combination of choices.
    ///
    /// Returns `Ok(false)` once every combination of the current state has
    /// been visited.
    ///
    /// # Errors
    ///
    /// Returns `Error::Nondeterminism` if the previous path did not handle
    /// exactly as many choices as are on the stack.
    pub fn prepare_next_path(&mut self) -> Result<bool> {
        if self.handled != self.chosen.len() {
            return Err(Error::Nondeterminism {
                handled: self.handled,
                depth: self.chosen.len(),
            });
        }

        // Every path replays from the first choice.
        self.handled = 0;

        if self.first_path {
            self.first_path = false;
            return Ok(true);
        }

        while let Some(last) = self.chosen.pop() {
            let count = self.value_counts.last().copied().unwrap_or(0);
            if last.option + 1 < count {
                let parent = self
                    .chosen
                    .last()
                    .map_or(Probability::ONE, |c| c.probability);
                self.chosen.push(ChosenValue::new(
                    last.option + 1,
                    parent,
                    Probability::uniform(count),
                    last.continuation + 1,
                ));
                return Ok(true);
            }
            self.value_counts.pop();
        }

        Ok(false)
    }

    /// Handles a nondeterministic choice between `value_count` options.
    pub fn handle_choice(&mut self, value_count: usize) -> usize {
        let kind = if value_count == 1 {
            ChoiceKind::Deterministic
        } else {
            ChoiceKind::Nondeterministic
        };
        self.resolve(value_count, kind, None)
    }

    /// Handles a probabilistic choice and records the probability of the branch taken.
    pub fn handle_probabilistic_choice(&mut self, probabilities: &[Probability]) -> usize {
        let index = self.handled;
        let option = self.resolve(probabilities.len(), ChoiceKind::Probabilistic, Some(probabilities));
        let prior = self.prior_probability(index);
        if let Some(value) = self.chosen.get_mut(index) {
            if !value.locked {
                let branch = probabilities.get(option).copied().unwrap_or(Probability::ZERO);
                value.branch = branch;
                value.probability = prior * branch;
            }
        }
        option
    }

    fn resolve(
        &mut self,
        value_count: usize,
        kind: ChoiceKind,
        probabilities: Option<&[Probability]>,
    ) -> usize {
        let index = self.handled;
        self.handled += 1;

        // Preselected while replaying the prefix of an earlier path.
        if let Some(value) = self.chosen.get(index) {
            return value.option;
        }

        let value_count = value_count.max(1);
        let parent = self.chosen.last();
        let prior = parent.map_or(Probability::ONE, |c| c.probability);
        let parent_continuation = parent.map_or(0, |c| c.continuation);
        let continuation = self
            .graph
            .split(parent_continuation, kind, value_count, probabilities);

        self.value_counts.push(value_count);
        self.chosen.push(ChosenValue::new(
            0,
            prior,
            Probability::uniform(value_count),
            continuation,
        ));
        0
    }

    fn prior_probability(&self, index: usize) -> Probability {
        index
            .checked_sub(1)
            .and_then(|i| self.chosen.get(i))
            .map_or(Probability::ONE, |c| c.probability)
    }

    /// Folds the untaken options of choice `index` into the current path.
    ///
    /// The caller asserts that every untaken option of that choice leads to
    /// the same successor as the path taken. The choice becomes
    /// deterministic and the probability mass of its siblings is added to
    /// this path: the choice carries its parent's full probability and the
    /// frames after it are recomputed from their own branch probabilities.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchChoice` if `index` is beyond the path and
    /// `Error::InvalidForward` if the choice does not select option 0.
    pub fn forward_untaken_choices_at_index(&mut self, index: usize) -> Result<()> {
        let depth = self.chosen.len();
        let value = *self
            .chosen
            .get(index)
            .ok_or(Error::NoSuchChoice { index, depth })?;
        if value.option != 0 {
            return Err(Error::InvalidForward {
                index,
                option: value.option,
            });
        }

        let mut prior = self.prior_probability(index);
        if let Some(frame) = self.chosen.get_mut(index) {
            frame.branch = Probability::ONE;
            frame.locked = true;
        }
        for frame in &mut self.chosen[index..] {
            frame.probability = prior * frame.branch;
            prior = frame.probability;
        }
        self.value_counts[index] = 0;

        let parent_continuation = index
            .checked_sub(1)
            .and_then(|i| self.chosen.get(i))
            .map_or(0, |c| c.continuation);
        self.graph.make_deterministic(parent_continuation);
        Ok(())
    }

    /// Prevents the remaining options of choice `index` from being explored.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchChoice` if `index` is beyond the path.
    pub fn make_choice_at_index_deterministic(&mut self, index: usize) -> Result<()> {
        let depth = self.value_counts.len();
        let count = self
            .value_counts
            .get_mut(index)
            .ok_or(Error::NoSuchChoice { index, depth })?;
        *count = 0;
        Ok(())
    }

    /// Cumulative probability of the path as built so far.
    #[must_use]
    pub fn calculate_probability_of_path(&self) -> Probability {
        self.prior_probability(self.handled)
    }

    /// Installs a fixed sequence of options to reproduce one exact path.
    ///
    /// Every installed choice is frozen, so the next call to
    /// [`ChoiceResolver::prepare_next_path`] after the replayed path returns
    /// `false`.
    pub fn set_choices(&mut self, choices: &[usize]) {
        self.prepare_next_state();
        for &option in choices {
            self.chosen
                .push(ChosenValue::new(option, Probability::ONE, Probability::ONE, 0));
            self.value_counts.push(0);
        }
        self.first_path = false;
    }

    /// Options chosen on the current path, from the first choice on.
    #[must_use]
    pub fn choices(&self) -> Vec<usize> {
        self.chosen.iter().map(|c| c.option).collect()
    }

    /// Number of choices handled on the current path.
    #[must_use]
    pub const fn handled_choices(&self) -> usize {
        self.handled
    }

    /// Index of the most recent choice on the current path.
    #[must_use]
    pub fn last_choice_index(&self) -> Option<usize> {
        self.handled.checked_sub(1)
    }

    /// The choice frames of the current path.
    #[must_use]
    pub fn chosen_values(&self) -> &[ChosenValue] {
        &self.chosen
    }

    /// Continuation the current path ends in.
    #[must_use]
    pub fn continuation_id(&self) -> usize {
        self.handled
            .checked_sub(1)
            .and_then(|i| self.chosen.get(i))
            .map_or(0, |c| c.continuation)
    }

    /// Continuation graph of the state being enumerated.
    #[must_use]
    pub const fn graph(&self) -> &ContinuationGraph {
        &self.graph
    }

    /// Releases all stack contents.
    pub fn clear(&mut self) {
        self.chosen.clear();
        self.value_counts.clear();
        self.handled = 0;
        self.first_path = false;
        self.graph.clear();
    }
}

impl Choose for ChoiceResolver {
    fn choose(&mut self, count: usize) -> usize {
        self.handle_choice(count)
    }

    fn choose_probabilistic(&mut self, probabilities: &[Probability]) -> usize {
        self.handle_probabilistic_choice(probabilities)
    }
}
