//! Persistence of the chosen study folder between runs.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::domain::model::TargetLanguage;

const STATE_DIR_ENV: &str = "REMARK_STATE_DIR";
const STATE_DIR: &str = "remark";
const STATE_FILE: &str = "state.json";

/// What survives a restart: the last folder and output language.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SavedState {
    #[serde(default)]
    pub selected_path: Option<PathBuf>,
    #[serde(default)]
    pub language: Option<TargetLanguage>,
}

/// Reads and writes [`SavedState`] as JSON inside a state directory.
#[derive(Debug, Clone)]
pub struct FolderStore {
    dir: PathBuf,
    path: PathBuf,
}

impl FolderStore {
    /// Create a store keeping its file in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(STATE_FILE);
        Self { dir, path }
    }

    /// Store under `$REMARK_STATE_DIR`, falling back to the platform data directory.
    pub fn default_location() -> Result<Self> {
        if let Some(dir) = env::var_os(STATE_DIR_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::new(PathBuf::from(dir)));
        }
        let base = dirs_next::data_dir()
            .ok_or_else(|| anyhow!("unable to determine a data directory; set {STATE_DIR_ENV}"))?;
        Ok(Self::new(base.join(STATE_DIR)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the persisted state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<SavedState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read state file at {}", self.path.display()))?;
        let state = serde_json::from_str(&data)
            .with_context(|| format!("invalid state data in {}", self.path.display()))?;
        Ok(Some(state))
    }

    /// Load the saved state, treating a corrupt file as absent.
    pub fn load_or_default(&self) -> SavedState {
        match self.load() {
            Ok(state) => state.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable saved state");
                SavedState::default()
            }
        }
    }

    /// Persist the provided state, creating the directory as needed.
    pub fn save(&self, state: &SavedState) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create state directory {}", self.dir.display()))?;

        let data =
            serde_json::to_string_pretty(state).context("failed to serialize saved state")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write state file to {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "saved state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FolderStore::new(temp.path().join("nested"));
        assert_eq!(store.load()?, None);
        assert_eq!(store.load_or_default(), SavedState::default());
        Ok(())
    }

    #[test]
    fn saved_folder_is_restored() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FolderStore::new(temp.path().join("nested"));
        let state = SavedState {
            selected_path: Some(PathBuf::from("/Users/me/notes")),
            language: Some(TargetLanguage::English),
        };
        store.save(&state)?;

        let reopened = FolderStore::new(temp.path().join("nested"));
        assert_eq!(reopened.load()?, Some(state));
        Ok(())
    }

    #[test]
    fn corrupt_file_falls_back_to_default() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FolderStore::new(temp.path());
        fs::write(store.path(), "{not json")?;
        assert!(store.load().is_err());
        assert_eq!(store.load_or_default(), SavedState::default());
        Ok(())
    }
}
