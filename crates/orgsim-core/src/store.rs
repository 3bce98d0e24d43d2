//! Result persistence keyed by simulation or sweep id.
//!
//! The engine only needs "write under this key, read back the same bytes".
//! [`ResultStore`] is the seam hosts plug their own storage into; two
//! implementations ship here:
//!
//! - [`FileResultStore`] -- `<root>/<simulation_id>/results.json` and
//!   `<root>/sweep_<sweep_id>/sweep_results.json`, pretty-printed JSON.
//! - [`MemoryResultStore`] -- serialized bytes in a map, for tests and
//!   embedding hosts.
//!
//! Ids become directory names, so they are checked to be path-safe before
//! any filesystem access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use orgsim_types::{SimulationId, SimulationResult, SweepId, SweepResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// File name of a persisted simulation result.
pub const RESULTS_FILE: &str = "results.json";

/// File name of a persisted sweep result.
pub const SWEEP_RESULTS_FILE: &str = "sweep_results.json";

/// Errors raised by result stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing is stored under the id.
    #[error("no stored result for {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The stored artifact exists but cannot be decoded.
    #[error("stored result for {id} is corrupt: {reason}")]
    Corrupt {
        /// The id that was looked up.
        id: String,
        /// Decoder message.
        reason: String,
    },

    /// The id cannot be used as a storage key.
    #[error("id {0:?} is not a valid storage key")]
    InvalidId(String),

    /// Filesystem failure.
    #[error("result store I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The result could not be serialized.
    #[error("failed to serialize result: {source}")]
    Serialize {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// Write-once, read-many persistence for run and sweep results.
pub trait ResultStore: Send + Sync {
    /// Persist a simulation result under its id.
    fn save_simulation(&self, result: &SimulationResult) -> Result<(), StoreError>;

    /// Load a simulation result by id.
    fn load_simulation(&self, id: &SimulationId) -> Result<SimulationResult, StoreError>;

    /// Persist a sweep result under its id.
    fn save_sweep(&self, result: &SweepResult) -> Result<(), StoreError>;

    /// Load a sweep result by id.
    fn load_sweep(&self, id: &SweepId) -> Result<SweepResult, StoreError>;
}

/// Reject ids that are empty, relative path components, or contain
/// anything other than ASCII alphanumerics, `-`, `_` and `.`.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let safe = !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if safe {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_owned()))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(id: &str, bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
        id: id.to_owned(),
        reason: e.to_string(),
    })
}

/// Stores results as JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    root: PathBuf,
}

impl FileResultStore {
    /// Create a store rooted at `root`. Directories are created on write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a simulation's result file.
    pub fn simulation_path(&self, id: &SimulationId) -> Result<PathBuf, StoreError> {
        validate_id(id.as_str())?;
        Ok(self.root.join(id.as_str()).join(RESULTS_FILE))
    }

    /// Path of a sweep's result file.
    pub fn sweep_path(&self, id: &SweepId) -> Result<PathBuf, StoreError> {
        validate_id(id.as_str())?;
        Ok(self
            .root
            .join(format!("sweep_{}", id.as_str()))
            .join(SWEEP_RESULTS_FILE))
    }

    fn write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "Result written");
        Ok(())
    }

    fn read(id: &str, path: &Path) -> Result<Vec<u8>, StoreError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                id: id.to_owned(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl ResultStore for FileResultStore {
    fn save_simulation(&self, result: &SimulationResult) -> Result<(), StoreError> {
        let path = self.simulation_path(&result.simulation_id)?;
        Self::write(&path, &encode(result)?)
    }

    fn load_simulation(&self, id: &SimulationId) -> Result<SimulationResult, StoreError> {
        let path = self.simulation_path(id)?;
        decode(id.as_str(), &Self::read(id.as_str(), &path)?)
    }

    fn save_sweep(&self, result: &SweepResult) -> Result<(), StoreError> {
        let path = self.sweep_path(&result.sweep_id)?;
        Self::write(&path, &encode(result)?)
    }

    fn load_sweep(&self, id: &SweepId) -> Result<SweepResult, StoreError> {
        let path = self.sweep_path(id)?;
        decode(id.as_str(), &Self::read(id.as_str(), &path)?)
    }
}

/// Keeps serialized results in memory.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    simulations: Mutex<HashMap<SimulationId, Vec<u8>>>,
    sweeps: Mutex<HashMap<SweepId, Vec<u8>>>,
}

impl MemoryResultStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored simulation results.
    pub fn simulation_count(&self) -> usize {
        self.simulations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Raw bytes stored for a simulation.
    pub fn simulation_bytes(&self, id: &SimulationId) -> Option<Vec<u8>> {
        self.simulations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

impl ResultStore for MemoryResultStore {
    fn save_simulation(&self, result: &SimulationResult) -> Result<(), StoreError> {
        validate_id(result.simulation_id.as_str())?;
        let bytes = encode(result)?;
        self.simulations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(result.simulation_id.clone(), bytes);
        Ok(())
    }

    fn load_simulation(&self, id: &SimulationId) -> Result<SimulationResult, StoreError> {
        let bytes = self
            .simulation_bytes(id)
            .ok_or_else(|| StoreError::NotFound {
                id: id.to_string(),
            })?;
        decode(id.as_str(), &bytes)
    }

    fn save_sweep(&self, result: &SweepResult) -> Result<(), StoreError> {
        validate_id(result.sweep_id.as_str())?;
        let bytes = encode(result)?;
        self.sweeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(result.sweep_id.clone(), bytes);
        Ok(())
    }

    fn load_sweep(&self, id: &SweepId) -> Result<SweepResult, StoreError> {
        let bytes = self
            .sweeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                id: id.to_string(),
            })?;
        decode(id.as_str(), &bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use orgsim_types::{BehaviorKind, ParameterSet, RunStatus, Scalar};

    use super::*;

    fn sample(id: &str) -> SimulationResult {
        let mut final_state = BTreeMap::new();
        final_state.insert("culture_homogeneity".to_owned(), Scalar::Float(0.75));
        SimulationResult {
            simulation_id: SimulationId::new(id),
            behavior_kind: BehaviorKind::SocialInfluence,
            status: RunStatus::Completed,
            steps_executed: 3,
            final_state,
            time_series: BTreeMap::new(),
            parameters: ParameterSet::new().with("influence_strength", 0.1),
        }
    }

    fn sample_sweep(id: &str) -> SweepResult {
        SweepResult {
            sweep_id: SweepId::new(id),
            behavior_kind: BehaviorKind::SocialInfluence,
            parameters: Vec::new(),
            steps: 10,
            metric: "culture_homogeneity".to_owned(),
            results: Vec::new(),
            grid: None,
        }
    }

    #[test]
    fn ids_must_be_path_safe() {
        assert!(validate_id("abc-123_x.5").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b", "name with space"] {
            assert!(matches!(validate_id(bad), Err(StoreError::InvalidId(_))));
        }
    }

    #[test]
    fn file_store_layout_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        let result = sample("run-1");
        store.save_simulation(&result).unwrap();
        assert!(dir.path().join("run-1").join(RESULTS_FILE).is_file());
        assert_eq!(store.load_simulation(&result.simulation_id).unwrap(), result);

        let sweep = sample_sweep("s1");
        store.save_sweep(&sweep).unwrap();
        assert!(dir.path().join("sweep_s1").join(SWEEP_RESULTS_FILE).is_file());
        assert_eq!(store.load_sweep(&sweep.sweep_id).unwrap(), sweep);
    }

    #[test]
    fn file_store_rereads_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        let result = sample("run-2");
        store.save_simulation(&result).unwrap();
        let path = store.simulation_path(&result.simulation_id).unwrap();
        let first = std::fs::read(&path).unwrap();
        let reloaded = store.load_simulation(&result.simulation_id).unwrap();
        store.save_simulation(&reloaded).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn missing_and_corrupt_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        assert!(matches!(
            store.load_simulation(&SimulationId::new("nope")),
            Err(StoreError::NotFound { .. })
        ));

        let path = store.simulation_path(&SimulationId::new("bad")).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            store.load_simulation(&SimulationId::new("bad")),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryResultStore::new();
        let result = sample("mem-1");
        store.save_simulation(&result).unwrap();
        assert_eq!(store.simulation_count(), 1);
        assert_eq!(store.load_simulation(&result.simulation_id).unwrap(), result);
        assert!(matches!(
            store.load_sweep(&SweepId::new("none")),
            Err(StoreError::NotFound { .. })
        ));
        let sweep = sample_sweep("mem-sweep");
        store.save_sweep(&sweep).unwrap();
        assert_eq!(store.load_sweep(&sweep.sweep_id).unwrap(), sweep);
    }
}
