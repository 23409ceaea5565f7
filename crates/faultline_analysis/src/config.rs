//! Analysis configuration.

use faultline_mc::CheckerConfig;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// How the faults of a candidate set are activated during its check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultActivationBehavior {
    /// Candidate faults may or may not activate in every step.
    #[default]
    Nondeterministic,
    /// Candidate faults are active in every step.
    ForceOnly,
    /// Forced first; nondeterministic if forcing finds no violation.
    ForceThenFallback,
}

impl std::fmt::Display for FaultActivationBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nondeterministic => write!(f, "nondeterministic"),
            Self::ForceOnly => write!(f, "force-only"),
            Self::ForceThenFallback => write!(f, "force-then-fallback"),
        }
    }
}

/// Configuration for [`SafetyAnalysis`](crate::SafetyAnalysis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Worker threads checking the candidates of one level.
    pub cpu_count: usize,
    /// State capacity of every single check.
    pub state_capacity: usize,
    /// Stack capacity of every single check.
    pub stack_capacity: usize,
    /// Record a counterexample for every cut set.
    pub generate_counter_examples: bool,
    /// Activation of candidate faults.
    pub fault_activation_behavior: FaultActivationBehavior,
    /// Largest fault universe accepted.
    pub max_faults: Option<usize>,
    /// Wall-clock budget of every single check, in milliseconds.
    pub time_limit_ms: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let checker = CheckerConfig::default();
        Self {
            cpu_count: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            state_capacity: checker.state_capacity,
            stack_capacity: checker.stack_capacity,
            generate_counter_examples: true,
            fault_activation_behavior: FaultActivationBehavior::default(),
            max_faults: None,
            time_limit_ms: None,
        }
    }
}

impl AnalysisConfig {
    /// Sets the number of worker threads.
    #[must_use]
    pub const fn with_cpu_count(mut self, cpu_count: usize) -> Self {
        self.cpu_count = cpu_count;
        self
    }

    /// Sets the per-check state capacity.
    #[must_use]
    pub const fn with_state_capacity(mut self, capacity: usize) -> Self {
        self.state_capacity = capacity;
        self
    }

    /// Sets the per-check stack capacity.
    #[must_use]
    pub const fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    /// Enables or disables counterexample generation.
    #[must_use]
    pub const fn with_counter_examples(mut self, enabled: bool) -> Self {
        self.generate_counter_examples = enabled;
        self
    }

    /// Sets the fault activation behavior.
    #[must_use]
    pub const fn with_activation(mut self, behavior: FaultActivationBehavior) -> Self {
        self.fault_activation_behavior = behavior;
        self
    }

    /// Limits the size of the fault universe.
    #[must_use]
    pub const fn with_max_faults(mut self, max_faults: usize) -> Self {
        self.max_faults = Some(max_faults);
        self
    }

    /// Sets the per-check time limit.
    #[must_use]
    pub const fn with_time_limit_ms(mut self, millis: u64) -> Self {
        self.time_limit_ms = Some(millis);
        self
    }

    /// Checker configuration used for every candidate.
    #[must_use]
    pub fn checker(&self) -> CheckerConfig {
        let config = CheckerConfig::default()
            .with_state_capacity(self.state_capacity)
            .with_stack_capacity(self.stack_capacity)
            .with_counterexample(self.generate_counter_examples);
        match self.time_limit_ms {
            Some(millis) => config.with_time_limit(Duration::from_millis(millis)),
            None => config,
        }
    }
}
