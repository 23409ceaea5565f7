//! Minimal critical fault set search.
//!
//! The search walks the power set of the fault universe level by level,
//! starting at the empty set. A candidate is a *cut set* if activating
//! exactly its faults makes the hazard reachable. Models are assumed to be
//! monotone: adding faults never makes a hazard unreachable. Under that
//! assumption every superset of a cut set is a cut set too, so supersets
//! are pruned instead of checked, and every cut set found is minimal.

use crate::config::{AnalysisConfig, FaultActivationBehavior};
use crate::error::{Error, Result};
use crate::result::{AnalysisResult, Inconclusive, LevelStats};
use faultline_mc::{CheckOutcome, Counterexample, InvariantChecker};
use faultline_model::{ActivationMode, FaultId, FaultSet, Model, ModelSnapshot};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of checking one candidate.
enum Verdict<S> {
    Cut(Option<Counterexample<S>>),
    Safe,
    Inconclusive(String),
}

/// Safety analysis driver.
#[derive(Debug, Clone, Default)]
pub struct SafetyAnalysis {
    config: AnalysisConfig,
}

impl SafetyAnalysis {
    /// Creates an analysis with the given configuration.
    #[must_use]
    pub const fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// The analysis configuration.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Finds every minimal set of faults whose activation makes `hazard` reachable.
    ///
    /// Faults the model declares suppressed are left out of the search;
    /// faults it declares forced are part of every checked set.
    ///
    /// # Errors
    ///
    /// Returns `Error::Precondition` if fault names are not unique or the
    /// fault universe exceeds `max_faults`. Exploration errors other than
    /// resource exhaustion abort the search; exhausted checks are reported
    /// as inconclusive instead.
    pub fn compute_minimal_critical_sets<M, H>(
        &self,
        model: &M,
        hazard: H,
    ) -> Result<AnalysisResult<M::State>>
    where
        M: Model + Serialize + DeserializeOwned,
        H: Fn(&M::State) -> bool + Sync,
    {
        let start = Instant::now();
        let faults = model.faults();

        faults
            .validate()
            .map_err(|e| Error::Precondition(e.to_string()))?;
        if let Some(max) = self.config.max_faults {
            if faults.len() > max {
                return Err(Error::Precondition(format!(
                    "model has {} faults, at most {max} are supported",
                    faults.len()
                )));
            }
        }

        let forced = faults.with_mode(ActivationMode::Forced);
        let suppressed = faults.with_mode(ActivationMode::Suppressed);
        let universe: Vec<FaultId> = faults
            .with_mode(ActivationMode::Nondeterministic)
            .iter()
            .collect();

        info!(
            model = model.name(),
            faults = faults.len(),
            candidates = universe.len(),
            forced = forced.len(),
            behavior = %self.config.fault_activation_behavior,
            "Starting safety analysis"
        );

        let snapshot = ModelSnapshot::capture(model)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.cpu_count.max(1))
            .build()?;

        let mut result = AnalysisResult {
            model: model.name().to_string(),
            faults: faults.clone(),
            minimal_cut_sets: Vec::new(),
            checked_sets: Vec::new(),
            counterexamples: HashMap::new(),
            inconclusive: Vec::new(),
            forced_faults: forced.clone(),
            suppressed_faults: suppressed,
            levels: Vec::new(),
            elapsed: start.elapsed(),
        };

        let mut candidates = vec![forced.clone()];
        let mut level = 0;

        while !candidates.is_empty() {
            let verdicts: Vec<Result<(Verdict<M::State>, usize)>> = pool.install(|| {
                candidates
                    .par_iter()
                    .map(|set| self.check::<M, H>(&snapshot, set, &forced, &hazard))
                    .collect()
            });

            let mut stats = LevelStats {
                level,
                candidates: candidates.len(),
                ..LevelStats::default()
            };
            let mut safe = Vec::new();

            for (set, verdict) in candidates.into_iter().zip(verdicts) {
                let (verdict, explored) = verdict?;
                stats.states += explored;
                result.checked_sets.push(set.clone());
                match verdict {
                    Verdict::Cut(counterexample) => {
                        debug!(set = %result.describe(&set), "Found cut set");
                        stats.cut_sets += 1;
                        if let Some(cx) = counterexample {
                            result.counterexamples.insert(set.clone(), cx);
                        }
                        result.minimal_cut_sets.push(set);
                    }
                    Verdict::Safe => {
                        stats.safe += 1;
                        safe.push(set);
                    }
                    Verdict::Inconclusive(reason) => {
                        warn!(set = %result.describe(&set), %reason, "Check inconclusive");
                        stats.inconclusive += 1;
                        result.inconclusive.push(Inconclusive { set, reason });
                    }
                }
            }

            info!(
                level,
                candidates = stats.candidates,
                cut_sets = stats.cut_sets,
                safe = stats.safe,
                inconclusive = stats.inconclusive,
                "Level checked"
            );
            result.levels.push(stats);

            candidates = next_level(&safe, &universe, &result.minimal_cut_sets);
            level += 1;
        }

        result.elapsed = start.elapsed();
        info!(
            model = %result.model,
            cut_sets = result.minimal_cut_sets.len(),
            checked = result.checked_sets.len(),
            elapsed_ms = u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Safety analysis finished"
        );
        Ok(result)
    }

    /// Checks one candidate and returns its verdict with the number of states explored.
    fn check<M, H>(
        &self,
        snapshot: &ModelSnapshot,
        set: &FaultSet,
        forced: &FaultSet,
        hazard: &H,
    ) -> Result<(Verdict<M::State>, usize)>
    where
        M: Model + DeserializeOwned,
        H: Fn(&M::State) -> bool,
    {
        let modes: &[ActivationMode] = match self.config.fault_activation_behavior {
            FaultActivationBehavior::Nondeterministic => &[ActivationMode::Nondeterministic],
            FaultActivationBehavior::ForceOnly => &[ActivationMode::Forced],
            FaultActivationBehavior::ForceThenFallback => {
                &[ActivationMode::Forced, ActivationMode::Nondeterministic]
            }
        };
        let checker = InvariantChecker::new(self.config.checker());
        let mut explored = 0;

        for &mode in modes {
            let mut model: M = snapshot.instantiate(set, mode)?;
            for id in forced.iter() {
                model.faults_mut().set_mode(id, ActivationMode::Forced)?;
            }

            match checker.check_invariant(&model, |s| !hazard(s)) {
                Ok(CheckOutcome::Violated {
                    counterexample,
                    stats,
                }) => {
                    explored += stats.states;
                    return Ok((Verdict::Cut(counterexample), explored));
                }
                Ok(CheckOutcome::Holds { stats }) => explored += stats.states,
                Err(e) if e.is_resource_exhaustion() => {
                    return Ok((Verdict::Inconclusive(e.to_string()), explored));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok((Verdict::Safe, explored))
    }
}

/// Candidates of the next level: every safe set extended by one fault,
/// without supersets of known cut sets.
fn next_level(safe: &[FaultSet], universe: &[FaultId], cut_sets: &[FaultSet]) -> Vec<FaultSet> {
    let mut seen = HashSet::new();
    let mut next: Vec<FaultSet> = safe
        .iter()
        .flat_map(|set| {
            universe
                .iter()
                .filter(|&&id| !set.contains(id))
                .map(move |&id| set.with(id))
        })
        .filter(|candidate| !cut_sets.iter().any(|cut| cut.is_subset_of(candidate)))
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect();
    next.sort_by_cached_key(|set| set.iter().map(FaultId::index).collect::<Vec<_>>());
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_model::fixtures::{
        CounterModel, PumpState, RedundantPumpModel, TankModel, TankState,
    };
    use faultline_model::{Choose, Faults};
    use proptest::prelude::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    fn set(ids: &[usize]) -> FaultSet {
        ids.iter().copied().map(FaultId::new).collect()
    }

    fn analysis() -> SafetyAnalysis {
        SafetyAnalysis::new(AnalysisConfig::default().with_cpu_count(2))
    }

    /// Faults latch; the hazard is reached once the latched set contains a target.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct LatchModel {
        faults: Faults,
    }

    impl LatchModel {
        fn new(count: usize) -> Self {
            let mut faults = Faults::new();
            for i in 0..count {
                faults.register(format!("f{i}"), ActivationMode::Nondeterministic);
            }
            Self { faults }
        }
    }

    impl Model for LatchModel {
        type State = FaultSet;

        fn name(&self) -> &str {
            "latch"
        }

        fn faults(&self) -> &Faults {
            &self.faults
        }

        fn faults_mut(&mut self) -> &mut Faults {
            &mut self.faults
        }

        fn construction_state(&self) -> FaultSet {
            FaultSet::empty()
        }

        fn step(&self, state: &FaultSet, choices: &mut dyn Choose) -> FaultSet {
            state.union(&self.faults.activation(choices))
        }
    }

    /// Relay that only misbehaves when its fault comes and goes.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct FlickerModel {
        faults: Faults,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    struct FlickerState {
        was_active: bool,
        chattered: bool,
    }

    impl FlickerModel {
        const CONTACT: FaultId = FaultId::new(0);

        fn new() -> Self {
            let mut faults = Faults::new();
            faults.register("contact", ActivationMode::Nondeterministic);
            Self { faults }
        }
    }

    impl Model for FlickerModel {
        type State = FlickerState;

        fn name(&self) -> &str {
            "flicker"
        }

        fn faults(&self) -> &Faults {
            &self.faults
        }

        fn faults_mut(&mut self) -> &mut Faults {
            &mut self.faults
        }

        fn construction_state(&self) -> FlickerState {
            FlickerState {
                was_active: false,
                chattered: false,
            }
        }

        fn step(&self, state: &FlickerState, choices: &mut dyn Choose) -> FlickerState {
            let active = self.faults.activation(choices).contains(Self::CONTACT);
            FlickerState {
                was_active: state.was_active || active,
                chattered: state.chattered || (state.was_active && !active),
            }
        }
    }

    #[test]
    fn redundant_pumps_need_both_faults() {
        let result = analysis()
            .compute_minimal_critical_sets(&RedundantPumpModel::new(), PumpState::no_pump_running)
            .unwrap();

        let a = RedundantPumpModel::PUMP_A.index();
        let b = RedundantPumpModel::PUMP_B.index();
        let c = RedundantPumpModel::SENSOR.index();

        assert_eq!(result.minimal_cut_sets, vec![set(&[a, b])]);
        assert_eq!(result.checked_sets.len(), 7);
        assert!(!result.was_checked(&set(&[a, b, c])));
        for safe in [set(&[]), set(&[a]), set(&[b]), set(&[c])] {
            assert!(result.was_checked(&safe));
            assert!(!result.is_cut_set(&safe));
        }
        assert!(result.is_complete());
        assert_eq!(result.levels.len(), 3);
        assert!(result.counterexample(&set(&[a, b])).is_some());
    }

    #[test]
    fn tank_has_two_single_point_failures() {
        let result = analysis()
            .compute_minimal_critical_sets(&TankModel::new(), TankState::overflowed)
            .unwrap();

        let stuck = TankModel::SENSOR_STUCK.index();
        let offset = TankModel::SENSOR_OFFSET.index();
        let valve = TankModel::VALVE_STUCK.index();

        assert_eq!(
            result.minimal_cut_sets,
            vec![set(&[stuck]), set(&[valve])]
        );
        assert!(result.was_checked(&set(&[offset])));
        assert!(!result.was_checked(&set(&[stuck, valve])));
        assert_eq!(result.checked_sets.len(), 4);
    }

    #[test]
    fn forced_faults_join_every_set() {
        let mut model = RedundantPumpModel::new();
        model
            .faults_mut()
            .set_mode(RedundantPumpModel::PUMP_A, ActivationMode::Forced)
            .unwrap();
        model
            .faults_mut()
            .set_mode(RedundantPumpModel::SENSOR, ActivationMode::Suppressed)
            .unwrap();

        let result = analysis()
            .compute_minimal_critical_sets(&model, PumpState::no_pump_running)
            .unwrap();

        let a = RedundantPumpModel::PUMP_A.index();
        let b = RedundantPumpModel::PUMP_B.index();
        assert_eq!(result.checked_sets, vec![set(&[a]), set(&[a, b])]);
        assert_eq!(result.minimal_cut_sets, vec![set(&[a, b])]);
        assert_eq!(result.forced_faults, set(&[a]));
        assert_eq!(result.suppressed_faults.len(), 1);
    }

    #[test]
    fn hazard_without_faults_stops_at_level_zero() {
        let result = analysis()
            .compute_minimal_critical_sets(&LatchModel::new(3), |_| true)
            .unwrap();
        assert_eq!(result.minimal_cut_sets, vec![FaultSet::empty()]);
        assert_eq!(result.checked_sets.len(), 1);
    }

    #[test]
    fn max_faults_is_a_precondition() {
        let analysis = SafetyAnalysis::new(AnalysisConfig::default().with_max_faults(2));
        let err = analysis
            .compute_minimal_critical_sets(&RedundantPumpModel::new(), PumpState::no_pump_running)
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn duplicate_fault_names_are_a_precondition() {
        let mut model = LatchModel::new(1);
        model
            .faults_mut()
            .register("f0", ActivationMode::Nondeterministic);
        let err = analysis()
            .compute_minimal_critical_sets(&model, |_| false)
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn exhausted_checks_are_inconclusive() {
        let analysis = SafetyAnalysis::new(AnalysisConfig::default().with_state_capacity(50));
        let result = analysis
            .compute_minimal_critical_sets(&CounterModel::new(0), |s| s.x < 0)
            .unwrap();
        assert!(result.minimal_cut_sets.is_empty());
        assert!(!result.is_complete());
        assert_eq!(result.inconclusive.len(), 1);
    }

    #[test]
    fn force_only_activates_every_step() {
        let analysis = SafetyAnalysis::new(
            AnalysisConfig::default()
                .with_cpu_count(1)
                .with_activation(FaultActivationBehavior::ForceOnly),
        );
        let result = analysis
            .compute_minimal_critical_sets(&TankModel::new(), TankState::overflowed)
            .unwrap();
        assert_eq!(result.minimal_cut_sets.len(), 2);
        assert_eq!(result.counterexamples.len(), 2);
    }

    #[test]
    fn fallback_finds_intermittent_faults() {
        let contact = set(&[FlickerModel::CONTACT.index()]);
        let run = |behavior| {
            SafetyAnalysis::new(
                AnalysisConfig::default()
                    .with_cpu_count(1)
                    .with_activation(behavior),
            )
            .compute_minimal_critical_sets(&FlickerModel::new(), |s: &FlickerState| s.chattered)
            .unwrap()
        };

        let forced = run(FaultActivationBehavior::ForceOnly);
        assert!(forced.minimal_cut_sets.is_empty());
        assert!(forced.was_checked(&contact));
        assert!(forced.is_complete());

        let fallback = run(FaultActivationBehavior::ForceThenFallback);
        assert_eq!(fallback.minimal_cut_sets, vec![contact.clone()]);
        assert!(!fallback.is_cut_set(&FaultSet::empty()));
        let cx = fallback.counterexample(&contact).unwrap();
        assert!(cx.states().last().unwrap().chattered);
    }

    #[test]
    fn time_limit_makes_checks_inconclusive() {
        let analysis = SafetyAnalysis::new(AnalysisConfig::default().with_time_limit_ms(0));
        let result = analysis
            .compute_minimal_critical_sets(&CounterModel::new(0), |s| s.x < 0)
            .unwrap();
        assert!(result.minimal_cut_sets.is_empty());
        assert!(!result.is_complete());
        assert_eq!(result.inconclusive.len(), 1);
        assert_eq!(result.inconclusive[0].set, FaultSet::empty());
        assert!(
            result.inconclusive[0].reason.contains("time limit"),
            "{}",
            result.inconclusive[0].reason
        );
    }

    #[test]
    fn summary_lists_cut_sets() {
        let result = analysis()
            .compute_minimal_critical_sets(&RedundantPumpModel::new(), PumpState::no_pump_running)
            .unwrap();
        insta::assert_snapshot!(result.to_string(), @r###"
        Safety analysis of 'redundant-pumps'
          faults: 3 (0 forced, 0 suppressed)
          checked sets: 7
          minimal cut sets: 1
            {pump_a, pump_b}
          complete: yes
        "###);
    }

    #[test]
    fn counterexamples_are_saved_per_cut_set() {
        let dir = tempdir().unwrap();
        let result = analysis()
            .compute_minimal_critical_sets(&TankModel::new(), TankState::overflowed)
            .unwrap();
        let paths = result.save_counterexamples(dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("cut-0-sensor_stuck.fcx"));

        let cx = Counterexample::<TankState>::load(&paths[1]).unwrap();
        assert!(cx.states().last().unwrap().overflowed());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn cut_sets_are_the_minimal_targets(
            count in 1usize..5,
            raw in prop::collection::vec(prop::collection::vec(0usize..4, 1..3), 1..4),
        ) {
            let targets: Vec<FaultSet> = raw
                .iter()
                .map(|ids| ids.iter().map(|&i| FaultId::new(i % count)).collect())
                .collect();
            let hazard_targets = targets.clone();
            let result = SafetyAnalysis::new(AnalysisConfig::default().with_cpu_count(2))
                .compute_minimal_critical_sets(&LatchModel::new(count), move |s: &FaultSet| {
                    hazard_targets.iter().any(|t| t.is_subset_of(s))
                })
                .unwrap();

            let mut expected: Vec<FaultSet> = targets
                .iter()
                .filter(|t| !targets.iter().any(|o| o.is_proper_subset_of(t)))
                .cloned()
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            let mut actual = result.minimal_cut_sets.clone();
            let key = |s: &FaultSet| s.iter().map(FaultId::index).collect::<Vec<_>>();
            expected.sort_by_key(key);
            actual.sort_by_key(key);
            prop_assert_eq!(actual, expected);

            for cut in &result.minimal_cut_sets {
                prop_assert!(!result
                    .minimal_cut_sets
                    .iter()
                    .any(|other| other.is_proper_subset_of(cut)));
                prop_assert!(!result
                    .checked_sets
                    .iter()
                    .any(|checked| cut.is_proper_subset_of(checked)));
            }
        }
    }
}
