//! Persistence of the CLI session between invocations.
//!
//! Each command loads the [`WorkflowState`] written by the previous one, applies its
//! transition and writes the result back to `session.json`.
//!
//! # Cache Strategy
//! - **JSON serialization**: Human-readable session file for debugging
//! - **Timestamping**: Track when the session was last saved
//! - **Self-healing**: A corrupt file or a vanished repository tree starts a new session

use crate::core::dirs::get_cache_directory;
use crate::core::error::{DeployerError, Result};
use crate::core::workflow::{WorkflowState, WorkflowStateMachine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub saved_at: DateTime<Utc>,
    pub state: WorkflowState,
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_FILE),
        }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(&get_cache_directory()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> WorkflowStateMachine {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("No session at {} ({e}); starting a new one", self.path.display());
                return WorkflowStateMachine::new();
            }
        };

        let snapshot: SessionSnapshot = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Session file {} is unreadable, starting over: {e}", self.path.display());
                return WorkflowStateMachine::new();
            }
        };

        if let Some(root) = snapshot.state.repository_tree_root() {
            if !root.exists() {
                log::warn!(
                    "Repository tree {} no longer exists, starting over",
                    root.display()
                );
                return WorkflowStateMachine::new();
            }
        }

        log::debug!("Resumed session saved at {}", snapshot.saved_at);
        WorkflowStateMachine::from_state(snapshot.state)
    }

    pub fn save(&self, machine: &WorkflowStateMachine) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DeployerError::cache_directory_creation_failed(parent, e))?;
        }

        let snapshot = SessionSnapshot {
            saved_at: Utc::now(),
            state: machine.state().clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| {
            log::error!("Failed to serialize session: {e}");
            DeployerError::cache_serialization_failed(e)
        })?;
        fs::write(&self.path, json).map_err(|e| DeployerError::cache_write_failed(&self.path, e))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workflow::{RepositorySource, Step};
    use tempfile::TempDir;

    fn source() -> RepositorySource {
        RepositorySource {
            owner: "acme".into(),
            repo: "demo".into(),
            branch: "main".into(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());

        let mut machine = WorkflowStateMachine::new();
        machine.set_repository(source(), temp.path().to_path_buf(), Vec::new());
        machine.advance(2);
        store.save(&machine).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.current_step(), Step::SelectConfig);
        assert_eq!(loaded.state(), machine.state());
    }

    #[test]
    fn test_missing_or_corrupt_session_starts_fresh() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        assert_eq!(store.load().current_step(), Step::DownloadAndEnv);

        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load().current_step(), Step::DownloadAndEnv);
    }

    #[test]
    fn test_vanished_tree_starts_fresh() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        let mut machine = WorkflowStateMachine::new();
        machine.set_repository(source(), temp.path().join("gone"), Vec::new());
        machine.advance(2);
        store.save(&machine).unwrap();

        assert!(store.load().state().repository_tree_root().is_none());
        store.clear().unwrap();
        assert!(!store.path().exists());
    }
}
