//! Key-value channel between pipeline stages.
//!
//! The registration stage publishes the new data asset version under
//! [`DATA_ASSET_VERSION_KEY`]; the retraining stage picks it up when no
//! version is given on the command line.

use crate::error::{TrainingError, TrainingResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub const DATA_ASSET_VERSION_KEY: &str = "data_asset_version";

pub trait TaskValues: Send + Sync {
    fn set(&self, key: &str, value: &str) -> TrainingResult<()>;

    fn get(&self, key: &str) -> TrainingResult<Option<String>>;
}

/// Task values persisted as a flat JSON object.
#[derive(Debug, Clone)]
pub struct FileTaskValues {
    path: PathBuf,
}

impl FileTaskValues {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> TrainingResult<BTreeMap<String, String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl TaskValues for FileTaskValues {
    fn set(&self, key: &str, value: &str) -> TrainingResult<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&values)?)?;
        debug!(key = %key, path = %self.path.display(), "Task value published");
        Ok(())
    }

    fn get(&self, key: &str) -> TrainingResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskValues {
    values: Mutex<BTreeMap<String, String>>,
}

impl InMemoryTaskValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskValues for InMemoryTaskValues {
    fn set(&self, key: &str, value: &str) -> TrainingResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| TrainingError::Other(anyhow::anyhow!("task values lock poisoned")))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> TrainingResult<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| TrainingError::Other(anyhow::anyhow!("task values lock poisoned")))?;
        Ok(values.get(key).cloned())
    }
}
