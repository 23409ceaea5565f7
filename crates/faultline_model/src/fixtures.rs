//! Small fixture models for tests, demos and the CLI.
//!
//! # Models
//!
//! - **Counter**: deterministic counter, no faults; long linear traces
//! - **Redundant pumps**: two pump faults and one irrelevant sensor fault;
//!   the hazard needs both pumps failed
//! - **Coin**: probabilistic flips until heads, with a wear fault that
//!   changes the bias (mixes nondeterminism and probability)
//! - **Tank**: level control whose sensor and valve are overridden by
//!   priority-ordered fault effects

use crate::effect::EffectTable;
use crate::fault::{ActivationMode, FaultId, Faults};
use crate::model::{Choose, Model};
use crate::probability::Probability;
use serde::{Deserialize, Serialize};

/// State of [`CounterModel`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterState {
    /// Current counter value.
    pub x: i64,
}

/// A counter that starts at a fixed value and increments every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterModel {
    start: i64,
    faults: Faults,
}

impl CounterModel {
    /// Creates a counter starting at `start`.
    #[must_use]
    pub const fn new(start: i64) -> Self {
        Self {
            start,
            faults: Faults::new(),
        }
    }
}

impl Model for CounterModel {
    type State = CounterState;

    fn name(&self) -> &str {
        "counter"
    }

    fn faults(&self) -> &Faults {
        &self.faults
    }

    fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    fn construction_state(&self) -> CounterState {
        CounterState { x: self.start }
    }

    fn step(&self, state: &CounterState, _choices: &mut dyn Choose) -> CounterState {
        CounterState { x: state.x + 1 }
    }
}

/// State of [`RedundantPumpModel`]. Failures latch once they occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PumpState {
    /// Pump A has failed.
    pub pump_a_failed: bool,
    /// Pump B has failed.
    pub pump_b_failed: bool,
    /// The flow sensor has failed.
    pub sensor_failed: bool,
}

impl PumpState {
    /// Hazard: neither pump delivers.
    #[must_use]
    pub const fn no_pump_running(&self) -> bool {
        self.pump_a_failed && self.pump_b_failed
    }
}

/// Two redundant pumps and a monitoring sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedundantPumpModel {
    faults: Faults,
}

impl Default for RedundantPumpModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RedundantPumpModel {
    /// Fault: pump A stops.
    pub const PUMP_A: FaultId = FaultId::new(0);
    /// Fault: pump B stops.
    pub const PUMP_B: FaultId = FaultId::new(1);
    /// Fault: the sensor stops reporting.
    pub const SENSOR: FaultId = FaultId::new(2);

    /// Creates the model with all faults nondeterministic.
    #[must_use]
    pub fn new() -> Self {
        let mut faults = Faults::new();
        faults.register("pump_a", ActivationMode::Nondeterministic);
        faults.register("pump_b", ActivationMode::Nondeterministic);
        faults.register("sensor", ActivationMode::Nondeterministic);
        Self { faults }
    }
}

impl Model for RedundantPumpModel {
    type State = PumpState;

    fn name(&self) -> &str {
        "redundant-pumps"
    }

    fn faults(&self) -> &Faults {
        &self.faults
    }

    fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    fn construction_state(&self) -> PumpState {
        PumpState::default()
    }

    fn step(&self, state: &PumpState, choices: &mut dyn Choose) -> PumpState {
        let active = self.faults.activation(choices);
        PumpState {
            pump_a_failed: state.pump_a_failed || active.contains(Self::PUMP_A),
            pump_b_failed: state.pump_b_failed || active.contains(Self::PUMP_B),
            sensor_failed: state.sensor_failed || active.contains(Self::SENSOR),
        }
    }
}

/// State of [`CoinModel`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinState {
    /// Number of flips so far, saturating at the model's limit.
    pub flips: u8,
    /// Heads came up; absorbing.
    pub heads: bool,
}

/// Flips a coin until heads comes up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinModel {
    max_flips: u8,
    faults: Faults,
    #[serde(skip, default = "CoinModel::bias_table")]
    bias: EffectTable<(), Probability>,
}

impl CoinModel {
    /// Fault: the coin is worn and lands heads only one time in ten.
    pub const WORN: FaultId = FaultId::new(0);

    /// Creates a coin model that stops counting after `max_flips`.
    ///
    /// The wear fault starts suppressed, so the model is a plain Markov chain
    /// until the fault is enabled.
    #[must_use]
    pub fn new(max_flips: u8) -> Self {
        let mut faults = Faults::new();
        faults.register("worn", ActivationMode::Suppressed);
        Self {
            max_flips,
            faults,
            bias: Self::bias_table(),
        }
    }

    fn bias_table() -> EffectTable<(), Probability> {
        EffectTable::new().with(Self::WORN, 1, |(), _| Probability::uniform(10))
    }
}

impl Model for CoinModel {
    type State = CoinState;

    fn name(&self) -> &str {
        "coin"
    }

    fn faults(&self) -> &Faults {
        &self.faults
    }

    fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    fn construction_state(&self) -> CoinState {
        CoinState::default()
    }

    fn step(&self, state: &CoinState, choices: &mut dyn Choose) -> CoinState {
        if state.heads || state.flips >= self.max_flips {
            return state.clone();
        }
        let active = self.faults.activation(choices);
        let heads = self.bias.resolve(&active, &(), Probability::uniform(2));
        let outcome = choices.choose_probabilistic(&[heads, heads.complement()]);
        CoinState {
            flips: state.flips + 1,
            heads: outcome == 0,
        }
    }
}

/// State of [`TankModel`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TankState {
    /// Fill level.
    pub level: u8,
    /// Controller requested draining.
    pub draining: bool,
}

/// A tank whose controller drains it between two sensor thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TankModel {
    faults: Faults,
    #[serde(skip, default = "TankModel::sensor_table")]
    sensor: EffectTable<u8, u8>,
    #[serde(skip, default = "TankModel::valve_table")]
    valve: EffectTable<(), bool>,
}

impl Default for TankModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TankModel {
    /// Fault: the level sensor reads zero.
    pub const SENSOR_STUCK: FaultId = FaultId::new(0);
    /// Fault: the level sensor reads one unit low.
    pub const SENSOR_OFFSET: FaultId = FaultId::new(1);
    /// Fault: the drain valve does not open.
    pub const VALVE_STUCK: FaultId = FaultId::new(2);

    /// Reading at which draining starts.
    pub const HIGH: u8 = 3;
    /// Reading at which draining stops.
    pub const LOW: u8 = 1;
    /// Level at which the tank overflows.
    pub const OVERFLOW: u8 = 6;

    /// Creates the model with all faults nondeterministic.
    #[must_use]
    pub fn new() -> Self {
        let mut faults = Faults::new();
        faults.register("sensor_stuck", ActivationMode::Nondeterministic);
        faults.register("sensor_offset", ActivationMode::Nondeterministic);
        faults.register("valve_stuck", ActivationMode::Nondeterministic);
        Self {
            faults,
            sensor: Self::sensor_table(),
            valve: Self::valve_table(),
        }
    }

    fn sensor_table() -> EffectTable<u8, u8> {
        EffectTable::new()
            .with(Self::SENSOR_STUCK, 2, |_, _| 0)
            .with(Self::SENSOR_OFFSET, 1, |level, _| level.saturating_sub(1))
    }

    fn valve_table() -> EffectTable<(), bool> {
        EffectTable::new().with(Self::VALVE_STUCK, 1, |(), _| false)
    }
}

impl TankState {
    /// Hazard: the tank overflowed.
    #[must_use]
    pub const fn overflowed(&self) -> bool {
        self.level >= TankModel::OVERFLOW
    }
}

impl Model for TankModel {
    type State = TankState;

    fn name(&self) -> &str {
        "tank"
    }

    fn faults(&self) -> &Faults {
        &self.faults
    }

    fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    fn construction_state(&self) -> TankState {
        TankState::default()
    }

    fn step(&self, state: &TankState, choices: &mut dyn Choose) -> TankState {
        if state.overflowed() {
            return state.clone();
        }
        let active = self.faults.activation(choices);
        let reading = self.sensor.resolve(&active, &state.level, state.level);
        let draining = if reading >= Self::HIGH {
            true
        } else if reading <= Self::LOW {
            false
        } else {
            state.draining
        };
        let open = self.valve.resolve(&active, &(), draining);
        let level = if open {
            state.level.saturating_sub(1)
        } else {
            (state.level + 1).min(Self::OVERFLOW)
        };
        TankState { level, draining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Always picks the first option.
    struct First;

    impl Choose for First {
        fn choose(&mut self, _count: usize) -> usize {
            0
        }

        fn choose_probabilistic(&mut self, _probabilities: &[Probability]) -> usize {
            0
        }
    }

    #[test]
    fn counter_increments() {
        let model = CounterModel::new(2);
        let s0 = model.initialize(&model.construction_state(), &mut First);
        let s1 = model.step(&s0, &mut First);
        assert_eq!(s0.x, 2);
        assert_eq!(s1.x, 3);
    }

    #[test]
    fn nominal_tank_never_overflows() {
        let model = TankModel::new();
        let mut state = model.construction_state();
        let mut max = 0;
        for _ in 0..50 {
            state = model.step(&state, &mut First);
            max = max.max(state.level);
        }
        assert_eq!(max, TankModel::HIGH);
    }

    #[test]
    fn coin_stops_after_heads() {
        let model = CoinModel::new(4);
        let s = model.step(&CoinState::default(), &mut First);
        assert!(s.heads);
        assert_eq!(model.step(&s, &mut First), s);
    }

    #[test]
    fn pump_faults_latch() {
        let model = RedundantPumpModel::new();
        let state = PumpState {
            pump_a_failed: true,
            ..PumpState::default()
        };
        let next = model.step(&state, &mut First);
        assert!(next.pump_a_failed);
        assert!(!next.no_pump_running());
    }
}
