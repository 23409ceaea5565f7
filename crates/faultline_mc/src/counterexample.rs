//! Restartable counterexamples and their persistence.
//!
//! A counterexample starts at the model's construction state. Transition
//! `i` turns `states[i]` into `states[i + 1]` using the recorded
//! `choices[i]`; transition 0 is the initialization.
//!
//! Saved files use the extension [`COUNTEREXAMPLE_EXTENSION`]. The body is
//! JSON wrapped in an envelope carrying a format tag and an xxh64 digest of
//! the trace, so truncated or edited files are rejected on load.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

/// File extension of saved counterexamples.
pub const COUNTEREXAMPLE_EXTENSION: &str = "fcx";

const FORMAT: &str = "faultline-counterexample";

/// A recorded violating execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterexample<S> {
    model: String,
    created_at: DateTime<Utc>,
    states: Vec<S>,
    choices: Vec<Vec<usize>>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format: String,
    digest: String,
    trace: serde_json::Value,
}

impl<S> Counterexample<S> {
    /// Starts a trace at `construction`.
    pub fn new(model: impl Into<String>, construction: S) -> Self {
        Self {
            model: model.into(),
            created_at: Utc::now(),
            states: vec![construction],
            choices: Vec::new(),
        }
    }

    /// Appends a transition.
    pub fn push(&mut self, choices: Vec<usize>, state: S) {
        self.choices.push(choices);
        self.states.push(state);
    }

    /// Keeps only the first `steps` transitions.
    pub fn truncate(&mut self, steps: usize) {
        self.choices.truncate(steps);
        self.states.truncate(steps + 1);
    }

    /// Number of recorded transitions.
    pub fn step_count(&self) -> usize {
        self.choices.len()
    }

    /// Recorded states; `states()[0]` is the construction state.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Recorded choices per transition.
    pub fn choices(&self) -> &[Vec<usize>] {
        &self.choices
    }

    /// State after `step` transitions.
    pub fn state(&self, step: usize) -> Option<&S> {
        self.states.get(step)
    }

    /// Name of the model that produced the trace.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// When the trace was recorded.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl<S: Serialize + DeserializeOwned> Counterexample<S> {
    /// xxh64 digest of the canonical JSON form of the trace.
    ///
    /// # Errors
    ///
    /// Returns an error if a state cannot be serialized.
    pub fn digest(&self) -> Result<u64> {
        let value = serde_json::to_value(self)?;
        digest_of(&value)
    }

    /// Writes the trace to `path` with the `fcx` extension.
    ///
    /// Returns the path actually written.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref().with_extension(COUNTEREXAMPLE_EXTENSION);
        let trace = serde_json::to_value(self)?;
        let envelope = Envelope {
            format: FORMAT.to_string(),
            digest: format!("{:016x}", digest_of(&trace)?),
            trace,
        };
        fs::write(&path, serde_json::to_vec_pretty(&envelope)?)?;
        debug!(path = %path.display(), steps = self.step_count(), "Saved counterexample");
        Ok(path)
    }

    /// Reads a trace written by [`Counterexample::save`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` or `Error::Json` for unreadable files and
    /// `Error::CorruptCounterexample` if the format tag, digest or trace
    /// shape does not check out.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let envelope: Envelope = serde_json::from_slice(&bytes)?;

        if envelope.format != FORMAT {
            return Err(Error::CorruptCounterexample(format!(
                "unexpected format '{}'",
                envelope.format
            )));
        }
        let expected = format!("{:016x}", digest_of(&envelope.trace)?);
        if envelope.digest != expected {
            return Err(Error::CorruptCounterexample(format!(
                "digest mismatch: recorded {}, computed {expected}",
                envelope.digest
            )));
        }

        let trace: Self = serde_json::from_value(envelope.trace)?;
        if trace.states.len() != trace.choices.len() + 1 {
            return Err(Error::CorruptCounterexample(format!(
                "{} states for {} transitions",
                trace.states.len(),
                trace.choices.len()
            )));
        }
        debug!(path = %path.display(), steps = trace.step_count(), "Loaded counterexample");
        Ok(trace)
    }
}

fn digest_of(value: &serde_json::Value) -> Result<u64> {
    Ok(xxh64(&serde_json::to_vec(value)?, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_model::fixtures::CounterState;
    use tempfile::tempdir;

    fn counter_trace(steps: i64) -> Counterexample<CounterState> {
        let mut cx = Counterexample::new("counter", CounterState { x: 2 });
        cx.push(Vec::new(), CounterState { x: 2 });
        for x in 3..3 + steps {
            cx.push(Vec::new(), CounterState { x });
        }
        cx
    }

    #[test]
    fn save_and_load_preserve_trace() {
        let dir = tempdir().unwrap();
        let cx = counter_trace(40);
        let path = cx.save(dir.path().join("counter")).unwrap();

        assert_eq!(path.extension().unwrap(), COUNTEREXAMPLE_EXTENSION);
        let loaded = Counterexample::<CounterState>::load(&path).unwrap();
        assert_eq!(loaded, cx);
        assert_eq!(loaded.step_count(), 41);
        assert_eq!(loaded.model_name(), "counter");
    }

    #[test]
    fn save_replaces_foreign_extension() {
        let dir = tempdir().unwrap();
        let path = counter_trace(1).save(dir.path().join("trace.json")).unwrap();
        assert_eq!(path, dir.path().join("trace.fcx"));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = counter_trace(5).save(dir.path().join("cx")).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let err = Counterexample::<CounterState>::load(&path).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn edited_trace_fails_digest() {
        let dir = tempdir().unwrap();
        let path = counter_trace(5).save(dir.path().join("cx")).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace("\"x\": 7", "\"x\": 70")).unwrap();

        let err = Counterexample::<CounterState>::load(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptCounterexample(_)));
    }

    #[test]
    fn wrong_format_tag_is_rejected() {
        let dir = tempdir().unwrap();
        let path = counter_trace(2).save(dir.path().join("cx")).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace(FORMAT, "something-else")).unwrap();

        let err = Counterexample::<CounterState>::load(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptCounterexample(_)));
    }

    #[test]
    fn truncate_keeps_prefix() {
        let mut cx = counter_trace(10);
        cx.truncate(3);
        assert_eq!(cx.step_count(), 3);
        assert_eq!(cx.states().len(), 4);
        assert_eq!(cx.state(3).unwrap().x, 4);
    }

    #[test]
    fn digest_depends_on_states() {
        let a = counter_trace(3);
        let mut b = a.clone();
        b.push(Vec::new(), CounterState { x: 99 });
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }
}
