//! Simulate command implementation.

use super::{Fixture, FixtureModel};
use anyhow::{Context, Result};
use faultline_model::fixtures::{CoinModel, CounterModel, RedundantPumpModel, TankModel};
use faultline_sim::Simulator;
use std::path::Path;
use tracing::info;

/// Runs the simulate command.
pub fn run(model: FixtureModel, seed: u64, steps: usize, output: Option<&Path>) -> Result<()> {
    match model {
        FixtureModel::Counter => simulate::<CounterModel>(seed, steps, output),
        FixtureModel::Pumps => simulate::<RedundantPumpModel>(seed, steps, output),
        FixtureModel::Coin => simulate::<CoinModel>(seed, steps, output),
        FixtureModel::Tank => simulate::<TankModel>(seed, steps, output),
    }
}

fn simulate<F: Fixture>(seed: u64, steps: usize, output: Option<&Path>) -> Result<()> {
    let mut sim = Simulator::new(F::build(), seed);
    info!("Simulating {} for {} step(s), seed {}", sim.model().name(), steps, seed);

    for _ in 0..steps {
        sim.step().context("Simulation step failed")?;
        if F::hazard(sim.state()) {
            info!("Hazard reached after {} step(s)", sim.cursor());
            break;
        }
    }
    println!("[{:>4}] {:?}", sim.cursor(), sim.state());

    if let Some(path) = output {
        let written = sim
            .trace()
            .save(path)
            .with_context(|| format!("Failed to save trace to {}", path.display()))?;
        info!("Saved trace: {}", written.display());
    }
    Ok(())
}
