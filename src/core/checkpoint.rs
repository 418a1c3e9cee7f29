use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::BatchError;

/// Commit cursor of a step: everything up to `offset` is durably written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Items consumed from the source, malformed ones included.
    pub offset: usize,
    pub write_count: usize,
    pub commit_count: usize,
    /// Malformed items skipped so far, counted against the skip limit.
    #[serde(default)]
    pub skip_count: usize,
}

/// Persistence of step checkpoints, keyed by step name.
pub trait CheckpointStore {
    fn load(&self, step_name: &str) -> Result<Option<Checkpoint>, BatchError>;

    fn save(&self, step_name: &str, checkpoint: &Checkpoint) -> Result<(), BatchError>;

    fn clear(&self, step_name: &str) -> Result<(), BatchError>;
}

/// Checkpoints kept in memory, lost with the process.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: Mutex<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self, step_name: &str) -> Result<Option<Checkpoint>, BatchError> {
        let checkpoints = self
            .checkpoints
            .lock()
            .map_err(|error| BatchError::Checkpoint(error.to_string()))?;
        Ok(checkpoints.get(step_name).copied())
    }

    fn save(&self, step_name: &str, checkpoint: &Checkpoint) -> Result<(), BatchError> {
        let mut checkpoints = self
            .checkpoints
            .lock()
            .map_err(|error| BatchError::Checkpoint(error.to_string()))?;
        checkpoints.insert(step_name.to_string(), *checkpoint);
        Ok(())
    }

    fn clear(&self, step_name: &str) -> Result<(), BatchError> {
        let mut checkpoints = self
            .checkpoints
            .lock()
            .map_err(|error| BatchError::Checkpoint(error.to_string()))?;
        checkpoints.remove(step_name);
        Ok(())
    }
}

/// Checkpoints stored as a JSON object in a single file.
///
/// Every save rewrites a temporary file next to the target and renames it
/// over the target, so a crash never leaves a truncated checkpoint.
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// File written before being renamed over the checkpoint file.
    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }

    fn read_all(&self) -> Result<HashMap<String, Checkpoint>, BatchError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|error| BatchError::Checkpoint(error.to_string()))?;
        serde_json::from_str(&content).map_err(|error| BatchError::Checkpoint(error.to_string()))
    }

    fn write_all(&self, checkpoints: &HashMap<String, Checkpoint>) -> Result<(), BatchError> {
        let content = serde_json::to_string_pretty(checkpoints)
            .map_err(|error| BatchError::Checkpoint(error.to_string()))?;

        let tmp_path = self.staging_path();
        fs::write(&tmp_path, content).map_err(|error| BatchError::Checkpoint(error.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|error| BatchError::Checkpoint(error.to_string()))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, step_name: &str) -> Result<Option<Checkpoint>, BatchError> {
        Ok(self.read_all()?.get(step_name).copied())
    }

    fn save(&self, step_name: &str, checkpoint: &Checkpoint) -> Result<(), BatchError> {
        let mut checkpoints = self.read_all()?;
        checkpoints.insert(step_name.to_string(), *checkpoint);
        self.write_all(&checkpoints)?;
        debug!("Checkpoint saved for {}: {:?}", step_name, checkpoint);
        Ok(())
    }

    fn clear(&self, step_name: &str) -> Result<(), BatchError> {
        let mut checkpoints = self.read_all()?;
        if checkpoints.remove(step_name).is_some() {
            self.write_all(&checkpoints)?;
        }
        Ok(())
    }
}

/// Checkpoint a new run of `step_name` starts from.
///
/// With `resume`, the stored checkpoint is returned as is. Without it, any
/// stored checkpoint is discarded and the run starts from the beginning.
pub fn resume_point(
    store: &dyn CheckpointStore,
    step_name: &str,
    resume: bool,
) -> Result<Option<Checkpoint>, BatchError> {
    if resume {
        return store.load(step_name);
    }

    store.clear(step_name)?;
    Ok(None)
}
