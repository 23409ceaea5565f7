//! Replay command implementation.

use super::{Fixture, FixtureModel};
use anyhow::{Context, Result};
use faultline_mc::Counterexample;
use faultline_model::fixtures::{CoinModel, CounterModel, RedundantPumpModel, TankModel};
use faultline_sim::Simulator;
use std::path::Path;
use tracing::info;

/// Runs the replay command.
pub fn run(model: FixtureModel, trace: &Path, step: Option<usize>) -> Result<()> {
    match model {
        FixtureModel::Counter => replay::<CounterModel>(trace, step),
        FixtureModel::Pumps => replay::<RedundantPumpModel>(trace, step),
        FixtureModel::Coin => replay::<CoinModel>(trace, step),
        FixtureModel::Tank => replay::<TankModel>(trace, step),
    }
}

fn replay<F: Fixture>(path: &Path, step: Option<usize>) -> Result<()> {
    let trace: Counterexample<F::State> = Counterexample::load(path)
        .with_context(|| format!("Failed to load counterexample: {}", path.display()))?;
    info!(
        "Loaded trace of '{}' with {} step(s), recorded {}",
        trace.model_name(),
        trace.step_count(),
        trace.created_at()
    );

    let mut sim = Simulator::from_counterexample(F::build(), trace)
        .context("Trace does not match the model")?;

    if let Some(step) = step {
        sim.fast_forward(step).context("Replay failed")?;
        print_state(&sim);
        return Ok(());
    }

    print_state(&sim);
    while sim.step().context("Replay failed")? {
        print_state(&sim);
    }
    Ok(())
}

fn print_state<F: Fixture>(sim: &Simulator<F>) {
    let marker = if F::hazard(sim.state()) { " <- hazard" } else { "" };
    println!("[{:>4}] {:?}{marker}", sim.cursor(), sim.state());
}
