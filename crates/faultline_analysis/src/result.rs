//! Analysis result types.

use crate::error::Result;
use faultline_mc::Counterexample;
use faultline_model::{FaultSet, Faults};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// A candidate whose check ran out of resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inconclusive {
    /// The candidate fault set.
    pub set: FaultSet,
    /// Why the check did not finish.
    pub reason: String,
}

/// Statistics of one cardinality level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelStats {
    /// Number of non-forced faults in every candidate of the level.
    pub level: usize,
    /// Candidates checked.
    pub candidates: usize,
    /// Candidates found to be cut sets.
    pub cut_sets: usize,
    /// Candidates found safe.
    pub safe: usize,
    /// Candidates that ran out of resources.
    pub inconclusive: usize,
    /// States explored over all candidates.
    pub states: usize,
}

/// Outcome of a minimal critical set search.
#[derive(Debug, Clone)]
pub struct AnalysisResult<S> {
    /// Name of the analysed model.
    pub model: String,
    /// Fault universe of the model.
    pub faults: Faults,
    /// Minimal fault sets that make the hazard reachable.
    pub minimal_cut_sets: Vec<FaultSet>,
    /// Every fault set that was checked, in check order.
    pub checked_sets: Vec<FaultSet>,
    /// A witness trace per cut set, if generation was enabled.
    pub counterexamples: HashMap<FaultSet, Counterexample<S>>,
    /// Candidates whose check ran out of resources.
    pub inconclusive: Vec<Inconclusive>,
    /// Faults forced by the model, part of every checked set.
    pub forced_faults: FaultSet,
    /// Faults suppressed by the model, excluded from the search.
    pub suppressed_faults: FaultSet,
    /// Per-level statistics.
    pub levels: Vec<LevelStats>,
    /// Total wall-clock time.
    pub elapsed: Duration,
}

impl<S> AnalysisResult<S> {
    /// Returns true if no check was inconclusive.
    pub fn is_complete(&self) -> bool {
        self.inconclusive.is_empty()
    }

    /// Returns true if `set` contains some minimal cut set.
    pub fn is_cut_set(&self, set: &FaultSet) -> bool {
        self.minimal_cut_sets.iter().any(|cut| cut.is_subset_of(set))
    }

    /// Returns true if `set` was checked.
    pub fn was_checked(&self, set: &FaultSet) -> bool {
        self.checked_sets.contains(set)
    }

    /// Renders a fault set with fault names.
    pub fn describe(&self, set: &FaultSet) -> String {
        self.faults.describe(set)
    }

    /// The witness trace of a cut set.
    pub fn counterexample(&self, set: &FaultSet) -> Option<&Counterexample<S>> {
        self.counterexamples.get(set)
    }
}

impl<S: Serialize + DeserializeOwned> AnalysisResult<S> {
    /// Saves every counterexample into `dir`, one file per cut set.
    ///
    /// Returns the written paths in cut set order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or a trace
    /// cannot be written.
    pub fn save_counterexamples(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for (index, set) in self.minimal_cut_sets.iter().enumerate() {
            let Some(cx) = self.counterexamples.get(set) else {
                continue;
            };
            let names: Vec<String> = set
                .iter()
                .map(|id| {
                    self.faults
                        .get(id)
                        .map_or_else(|| id.index().to_string(), |f| f.name.clone())
                })
                .collect();
            let stem = if names.is_empty() {
                format!("cut-{index}-nominal")
            } else {
                format!("cut-{index}-{}", names.join("+"))
            };
            written.push(cx.save(dir.join(stem))?);
        }
        info!(dir = %dir.display(), count = written.len(), "Saved counterexamples");
        Ok(written)
    }
}

impl<S> fmt::Display for AnalysisResult<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Safety analysis of '{}'", self.model)?;
        writeln!(
            f,
            "  faults: {} ({} forced, {} suppressed)",
            self.faults.len(),
            self.forced_faults.len(),
            self.suppressed_faults.len()
        )?;
        writeln!(f, "  checked sets: {}", self.checked_sets.len())?;
        writeln!(f, "  minimal cut sets: {}", self.minimal_cut_sets.len())?;
        for set in &self.minimal_cut_sets {
            writeln!(f, "    {}", self.describe(set))?;
        }
        if !self.inconclusive.is_empty() {
            writeln!(f, "  inconclusive: {}", self.inconclusive.len())?;
            for entry in &self.inconclusive {
                writeln!(f, "    {}: {}", self.describe(&entry.set), entry.reason)?;
            }
        }
        write!(
            f,
            "  complete: {}",
            if self.is_complete() { "yes" } else { "no" }
        )
    }
}
