// In crates/state-store/src/lib.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub mod convert;
pub mod error;
mod lenient;
pub mod types;

// Re-export the most important types for easy access.
pub use convert::{from_persistable, to_persistable};
pub use error::{Error, Result};
pub use types::{PersistedState, PersistedSymbolState};

/// A JSON file holding the persisted strategy state.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the state file. A missing file is `Ok(None)`; an unparseable one is `Error::Corrupt`.
    pub fn load(&self) -> Result<Option<PersistedState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No state file found.");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let state = serde_json::from_str(&content).map_err(|source| Error::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), "Strategy state loaded.");
        Ok(Some(state))
    }

    /// Writes the state file atomically: a temp file next to it, then a rename.
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Strategy state saved.");
        Ok(())
    }
}
