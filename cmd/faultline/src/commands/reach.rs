//! Reach command implementation.

use super::{Fixture, FixtureModel};
use anyhow::{Context, Result};
use faultline_mc::{Extremum, MarkovBuilder};
use faultline_model::fixtures::{CoinModel, CounterModel, RedundantPumpModel, TankModel};
use faultline_model::ActivationMode;
use tracing::info;

const STATE_CAPACITY: usize = 100_000;

/// Runs the reach command.
pub fn run(model: FixtureModel, steps: usize, faults: bool) -> Result<()> {
    match model {
        FixtureModel::Counter => reach::<CounterModel>(steps, faults),
        FixtureModel::Pumps => reach::<RedundantPumpModel>(steps, faults),
        FixtureModel::Coin => reach::<CoinModel>(steps, faults),
        FixtureModel::Tank => reach::<TankModel>(steps, faults),
    }
}

fn reach<F: Fixture>(steps: usize, faults: bool) -> Result<()> {
    let mut model = F::build();
    if faults {
        let all = model.faults().iter().map(|(id, _)| id).collect();
        model
            .faults_mut()
            .assign(&all, ActivationMode::Nondeterministic);
    }

    let chain = MarkovBuilder::new(STATE_CAPACITY)
        .build(&model)
        .with_context(|| format!("Failed to build Markov model of '{}'", model.name()))?;
    info!(
        "Built {} with {} state(s)",
        if chain.is_dtmc() { "DTMC" } else { "MDP" },
        chain.states().len()
    );

    let max = chain.bounded_reachability(F::hazard, steps, Extremum::Max);
    if chain.is_dtmc() {
        println!("P(hazard within {steps} steps) = {max}");
    } else {
        let min = chain.bounded_reachability(F::hazard, steps, Extremum::Min);
        println!("P(hazard within {steps} steps) in [{min}, {max}]");
    }
    Ok(())
}
