//! Serialized model snapshots.
//!
//! A snapshot is taken once before an analysis and re-instantiated for every
//! fault assignment that has to be checked, so the model description is
//! never re-derived per candidate.

use crate::error::Result;
use crate::fault::ActivationMode;
use crate::fault_set::FaultSet;
use crate::model::Model;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Opaque serialized form of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSnapshot {
    name: String,
    bytes: Vec<u8>,
}

impl ModelSnapshot {
    /// Serializes a model.
    ///
    /// # Errors
    ///
    /// Returns `Error::Snapshot` if the model cannot be serialized.
    pub fn capture<M: Model + Serialize>(model: &M) -> Result<Self> {
        let bytes = serde_json::to_vec(model)?;
        debug!("Captured snapshot of {} ({} bytes)", model.name(), bytes.len());
        Ok(Self {
            name: model.name().to_string(),
            bytes,
        })
    }

    /// Re-creates the model exactly as it was captured.
    ///
    /// # Errors
    ///
    /// Returns `Error::Snapshot` if the bytes do not describe an `M`.
    pub fn restore<M: Model + DeserializeOwned>(&self) -> Result<M> {
        Ok(serde_json::from_slice(&self.bytes)?)
    }

    /// Re-creates the model with `active` faults in `mode` and all others suppressed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Snapshot` if the bytes do not describe an `M`.
    pub fn instantiate<M: Model + DeserializeOwned>(
        &self,
        active: &FaultSet,
        mode: ActivationMode,
    ) -> Result<M> {
        let mut model: M = self.restore()?;
        model.faults_mut().assign(active, mode);
        Ok(model)
    }

    /// Name of the captured model.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw snapshot bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
