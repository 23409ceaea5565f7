//! Replay of recorded traces and seeded free-running simulation.
//!
//! The simulator owns a model and a trace. The cursor selects one state of
//! the trace; moving the cursor re-executes the model with the recorded
//! choices. Moving backwards restarts from the construction state, so a
//! rewind costs as many transitions as the new cursor position.

use crate::error::{Error, Result};
use faultline_mc::{ChoiceResolver, Counterexample};
use faultline_model::{Choose, Model, Probability};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Resolves choices from a seeded RNG and records them.
struct RandomChooser<'a> {
    rng: &'a mut ChaCha8Rng,
    taken: Vec<usize>,
}

impl Choose for RandomChooser<'_> {
    fn choose(&mut self, count: usize) -> usize {
        let option = self.rng.gen_range(0..count.max(1));
        self.taken.push(option);
        option
    }

    fn choose_probabilistic(&mut self, probabilities: &[Probability]) -> usize {
        let roll: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        let mut option = probabilities.len().saturating_sub(1);
        for (index, p) in probabilities.iter().enumerate() {
            cumulative += p.value();
            if roll < cumulative {
                option = index;
                break;
            }
        }
        self.taken.push(option);
        option
    }
}

/// Steps through a trace of a model.
pub struct Simulator<M: Model> {
    model: M,
    trace: Counterexample<M::State>,
    cursor: usize,
    state: M::State,
    resolver: ChoiceResolver,
    rng: Option<ChaCha8Rng>,
}

impl<M: Model> std::fmt::Debug for Simulator<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("model", &self.model.name())
            .field("cursor", &self.cursor)
            .field("step_count", &self.trace.step_count())
            .field("state", &self.state)
            .field("free_running", &self.rng.is_some())
            .finish_non_exhaustive()
    }
}

impl<M: Model> Simulator<M> {
    /// Creates a free-running simulator whose choices come from a seeded RNG.
    pub fn new(model: M, seed: u64) -> Self {
        let construction = model.construction_state();
        Self {
            trace: Counterexample::new(model.name(), construction.clone()),
            model,
            cursor: 0,
            state: construction,
            resolver: ChoiceResolver::new(),
            rng: Some(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Creates a simulator replaying `trace`, positioned at the construction state.
    ///
    /// # Errors
    ///
    /// Returns `Error::ModelMismatch` if the trace was recorded for another
    /// model and `Error::ReplayDiverged` if the model's construction state
    /// differs from the recorded one.
    pub fn from_counterexample(model: M, trace: Counterexample<M::State>) -> Result<Self> {
        if trace.model_name() != model.name() {
            return Err(Error::ModelMismatch {
                recorded: trace.model_name().to_string(),
                model: model.name().to_string(),
            });
        }
        let construction = model.construction_state();
        if trace.state(0) != Some(&construction) {
            return Err(Error::ReplayDiverged { step: 0 });
        }
        Ok(Self {
            model,
            trace,
            cursor: 0,
            state: construction,
            resolver: ChoiceResolver::new(),
            rng: None,
        })
    }

    /// The current state.
    pub const fn state(&self) -> &M::State {
        &self.state
    }

    /// Number of transitions taken from the construction state.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of recorded transitions.
    pub fn step_count(&self) -> usize {
        self.trace.step_count()
    }

    /// The recorded trace.
    pub const fn trace(&self) -> &Counterexample<M::State> {
        &self.trace
    }

    /// Consumes the simulator and returns its trace.
    pub fn into_trace(self) -> Counterexample<M::State> {
        self.trace
    }

    /// The simulated model.
    pub const fn model(&self) -> &M {
        &self.model
    }

    /// Advances by up to `steps` recorded transitions.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReplayDiverged` if the model does not reproduce the trace.
    pub fn fast_forward(&mut self, steps: usize) -> Result<()> {
        let target = self.cursor.saturating_add(steps).min(self.step_count());
        debug!(from = self.cursor, to = target, "Fast forward");
        while self.cursor < target {
            self.replay_next()?;
        }
        Ok(())
    }

    /// Moves back by up to `steps` transitions.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReplayDiverged` if the model does not reproduce the trace.
    pub fn rewind(&mut self, steps: usize) -> Result<()> {
        let target = self.cursor.saturating_sub(steps);
        debug!(from = self.cursor, to = target, "Rewind");
        self.reset();
        while self.cursor < target {
            self.replay_next()?;
        }
        Ok(())
    }

    /// Returns to the construction state.
    pub fn reset(&mut self) {
        self.cursor = 0;
        if let Some(construction) = self.trace.state(0) {
            self.state = construction.clone();
        }
    }

    /// Takes one transition.
    ///
    /// Recorded transitions are replayed. Past the end of the trace a
    /// free-running simulator draws new choices and extends the trace;
    /// a replaying simulator stays put.
    ///
    /// Returns whether the cursor moved.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReplayDiverged` if the model does not reproduce the trace.
    pub fn step(&mut self) -> Result<bool> {
        if self.cursor < self.step_count() {
            self.replay_next()?;
            return Ok(true);
        }
        let Some(rng) = self.rng.as_mut() else {
            return Ok(false);
        };

        let mut chooser = RandomChooser {
            rng,
            taken: Vec::new(),
        };
        let next = if self.cursor == 0 {
            self.model.initialize(&self.state, &mut chooser)
        } else {
            self.model.step(&self.state, &mut chooser)
        };
        let taken = chooser.taken;
        self.trace.push(taken, next.clone());
        self.state = next;
        self.cursor += 1;
        Ok(true)
    }

    /// Discards every recorded transition after the cursor.
    pub fn truncate(&mut self) {
        self.trace.truncate(self.cursor);
    }

    fn replay_next(&mut self) -> Result<()> {
        let step = self.cursor + 1;
        let choices = self
            .trace
            .choices()
            .get(self.cursor)
            .ok_or(Error::ReplayDiverged { step })?;

        self.resolver.set_choices(choices);
        let next = if self.cursor == 0 {
            self.model.initialize(&self.state, &mut self.resolver)
        } else {
            self.model.step(&self.state, &mut self.resolver)
        };

        if self.resolver.handled_choices() != choices.len()
            || self.trace.state(step) != Some(&next)
        {
            return Err(Error::ReplayDiverged { step });
        }
        self.state = next;
        self.cursor = step;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_mc::{CheckerConfig, InvariantChecker};
    use faultline_model::fixtures::{
        CoinModel, CounterModel, CounterState, PumpState, RedundantPumpModel, TankModel,
    };
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn counter_trace() -> Counterexample<CounterState> {
        InvariantChecker::new(CheckerConfig::default())
            .check_invariant(&CounterModel::new(2), |s| s.x != 42)
            .unwrap()
            .into_counterexample()
            .unwrap()
    }

    #[test]
    fn fast_forward_and_rewind_clamp() {
        let mut sim =
            Simulator::from_counterexample(CounterModel::new(2), counter_trace()).unwrap();
        assert_eq!(sim.step_count(), 41);

        sim.fast_forward(10).unwrap();
        assert_eq!(sim.cursor(), 10);
        sim.fast_forward(600).unwrap();
        assert_eq!(sim.cursor(), 41);
        assert_eq!(sim.state().x, 42);

        sim.rewind(10).unwrap();
        assert_eq!(sim.state().x, 32);
        sim.rewind(100).unwrap();
        assert_eq!(sim.cursor(), 0);
        assert_eq!(sim.state().x, 2);
    }

    #[test]
    fn step_stops_at_end_of_replay() {
        let mut sim =
            Simulator::from_counterexample(CounterModel::new(2), counter_trace()).unwrap();
        sim.fast_forward(40).unwrap();
        assert!(sim.step().unwrap());
        assert!(!sim.step().unwrap());
        assert_eq!(sim.cursor(), 41);
    }

    #[test]
    fn saved_trace_replays_identically() {
        let dir = tempdir().unwrap();
        let trace = counter_trace();
        let path = trace.save(dir.path().join("counter")).unwrap();
        let loaded = Counterexample::<CounterState>::load(&path).unwrap();
        assert_eq!(loaded.states(), trace.states());

        let mut sim = Simulator::from_counterexample(CounterModel::new(2), loaded).unwrap();
        sim.fast_forward(usize::MAX).unwrap();
        assert_eq!(sim.cursor(), 41);
        assert_eq!(sim.state().x, 42);
    }

    #[test]
    fn different_start_diverges() {
        let err = Simulator::from_counterexample(CounterModel::new(3), counter_trace()).unwrap_err();
        assert!(matches!(err, Error::ReplayDiverged { step: 0 }));
    }

    #[test]
    fn tampered_state_diverges() {
        let mut trace = Counterexample::new("counter", CounterState { x: 2 });
        trace.push(Vec::new(), CounterState { x: 2 });
        trace.push(Vec::new(), CounterState { x: 3 });
        trace.push(Vec::new(), CounterState { x: 7 });

        let mut sim = Simulator::from_counterexample(CounterModel::new(2), trace).unwrap();
        let err = sim.fast_forward(3).unwrap_err();
        assert!(matches!(err, Error::ReplayDiverged { step: 3 }));
        assert_eq!(sim.cursor(), 2);
    }

    #[test]
    fn extra_recorded_choices_diverge() {
        let mut trace = Counterexample::new("counter", CounterState { x: 2 });
        trace.push(vec![1], CounterState { x: 2 });
        let mut sim = Simulator::from_counterexample(CounterModel::new(2), trace).unwrap();
        assert!(matches!(
            sim.step().unwrap_err(),
            Error::ReplayDiverged { step: 1 }
        ));
    }

    #[test]
    fn wrong_model_is_rejected() {
        let err = Simulator::from_counterexample(TankModel::new(), {
            let mut trace = Counterexample::new("counter", TankModel::new().construction_state());
            trace.push(Vec::new(), TankModel::new().construction_state());
            trace
        })
        .unwrap_err();
        assert!(matches!(err, Error::ModelMismatch { .. }));
    }

    #[test]
    fn checker_trace_with_choices_replays() {
        let trace = InvariantChecker::default()
            .check_invariant(&RedundantPumpModel::new(), |s: &PumpState| {
                !s.no_pump_running()
            })
            .unwrap()
            .into_counterexample()
            .unwrap();
        let steps = trace.step_count();

        let mut sim = Simulator::from_counterexample(RedundantPumpModel::new(), trace).unwrap();
        sim.fast_forward(steps).unwrap();
        assert!(sim.state().no_pump_running());
    }

    #[test]
    fn free_running_is_reproducible() {
        let run = |seed| {
            let mut sim = Simulator::new(CoinModel::new(8), seed);
            for _ in 0..10 {
                sim.step().unwrap();
            }
            sim.into_trace()
        };
        let a = run(42);
        let b = run(42);
        assert_eq!(a.states(), b.states());
        assert_eq!(a.choices(), b.choices());
        assert_eq!(a.step_count(), 10);
    }

    #[test]
    fn free_running_trace_can_be_rewound() {
        let mut sim = Simulator::new(RedundantPumpModel::new(), 7);
        for _ in 0..12 {
            sim.step().unwrap();
        }
        let last = sim.state().clone();

        sim.rewind(12).unwrap();
        assert_eq!(sim.state(), &PumpState::default());
        sim.fast_forward(12).unwrap();
        assert_eq!(sim.state(), &last);

        sim.rewind(5).unwrap();
        sim.truncate();
        assert_eq!(sim.step_count(), 7);
        assert!(sim.step().unwrap());
        assert_eq!(sim.step_count(), 8);
    }

    proptest! {
        #[test]
        fn cursor_stays_within_trace(moves in prop::collection::vec((any::<bool>(), 0usize..60), 0..20)) {
            let mut sim =
                Simulator::from_counterexample(CounterModel::new(2), counter_trace()).unwrap();
            for (forward, steps) in moves {
                if forward {
                    sim.fast_forward(steps).unwrap();
                } else {
                    sim.rewind(steps).unwrap();
                }
                prop_assert!(sim.cursor() <= 41);
                let expected = if sim.cursor() == 0 { 2 } else { i64::try_from(sim.cursor()).unwrap() + 1 };
                prop_assert_eq!(sim.state().x, expected);
            }
        }
    }
}
