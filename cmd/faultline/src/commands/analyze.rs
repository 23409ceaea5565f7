//! Analyze command implementation.

use super::{Fixture, FixtureModel};
use anyhow::{Context, Result};
use faultline_analysis::{AnalysisConfig, SafetyAnalysis};
use faultline_model::fixtures::{CoinModel, CounterModel, RedundantPumpModel, TankModel};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Runs the analyze command.
pub fn run(
    model: FixtureModel,
    config_path: Option<&Path>,
    cpu_count: Option<usize>,
    state_capacity: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(cpu_count) = cpu_count {
        config.cpu_count = cpu_count;
    }
    if let Some(capacity) = state_capacity {
        config.state_capacity = capacity;
    }

    match model {
        FixtureModel::Counter => analyze::<CounterModel>(config, output),
        FixtureModel::Pumps => analyze::<RedundantPumpModel>(config, output),
        FixtureModel::Coin => analyze::<CoinModel>(config, output),
        FixtureModel::Tank => analyze::<TankModel>(config, output),
    }
}

fn analyze<F: Fixture>(config: AnalysisConfig, output: Option<&Path>) -> Result<()> {
    let model = F::build();
    info!("Analysing model: {}", model.name());

    let result = SafetyAnalysis::new(config)
        .compute_minimal_critical_sets(&model, F::hazard)
        .with_context(|| format!("Safety analysis of '{}' failed", model.name()))?;

    println!("{result}");
    info!("Finished in {:.2?}", result.elapsed);

    if !result.is_complete() {
        warn!(
            "{} check(s) ran out of resources; cut sets may be missing",
            result.inconclusive.len()
        );
    }

    if let Some(dir) = output {
        let paths = result
            .save_counterexamples(dir)
            .with_context(|| format!("Failed to save counterexamples to {}", dir.display()))?;
        for path in paths {
            info!("Saved counterexample: {}", path.display());
        }
    }

    Ok(())
}

/// Loads an analysis configuration from YAML (`.yaml`, `.yml`) or JSON.
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
        _ => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_analysis::FaultActivationBehavior;
    use tempfile::tempdir;

    #[test]
    fn loads_yaml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analysis.yaml");
        fs::write(
            &path,
            "cpu_count: 3\nfault_activation_behavior: force_then_fallback\nmax_faults: 8\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cpu_count, 3);
        assert_eq!(
            config.fault_activation_behavior,
            FaultActivationBehavior::ForceThenFallback
        );
        assert_eq!(config.max_faults, Some(8));
    }

    #[test]
    fn loads_json_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        fs::write(&path, r#"{"state_capacity": 500, "generate_counter_examples": false}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.state_capacity, 500);
        assert!(!config.generate_counter_examples);
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_config(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn analyze_saves_counterexamples() {
        let dir = tempdir().unwrap();
        run(
            FixtureModel::Pumps,
            None,
            Some(1),
            None,
            Some(dir.path()),
        )
        .unwrap();
        let saved = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(saved, 1);
    }
}
