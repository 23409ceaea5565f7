//! Command implementations.

pub mod analyze;
pub mod reach;
pub mod replay;
pub mod simulate;

use clap::ValueEnum;
use faultline_model::fixtures::{
    CoinModel, CoinState, CounterModel, CounterState, PumpState, RedundantPumpModel, TankModel,
    TankState,
};
use faultline_model::Model;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Fixture models selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FixtureModel {
    /// Counter from 2; hazard once it reaches 42
    Counter,
    /// Redundant pumps; hazard when neither pump runs
    Pumps,
    /// Coin flipped up to 8 times; hazard on heads
    Coin,
    /// Level-controlled tank; hazard on overflow
    Tank,
}

/// A fixture model together with its hazard.
pub trait Fixture: Model + Serialize + DeserializeOwned {
    /// Builds the model as shipped.
    fn build() -> Self;

    /// The hazard predicate.
    fn hazard(state: &Self::State) -> bool;
}

impl Fixture for CounterModel {
    fn build() -> Self {
        Self::new(2)
    }

    fn hazard(state: &CounterState) -> bool {
        state.x >= 42
    }
}

impl Fixture for RedundantPumpModel {
    fn build() -> Self {
        Self::new()
    }

    fn hazard(state: &PumpState) -> bool {
        state.no_pump_running()
    }
}

impl Fixture for CoinModel {
    fn build() -> Self {
        Self::new(8)
    }

    fn hazard(state: &CoinState) -> bool {
        state.heads
    }
}

impl Fixture for TankModel {
    fn build() -> Self {
        Self::new()
    }

    fn hazard(state: &TankState) -> bool {
        state.overflowed()
    }
}
