//! Durable JSON snapshot of per-repository outcomes.
//!
//! Whole-snapshot load/save: `save` rewrites the full record, it never
//! appends or patches. Single-writer assumption; concurrent writers from
//! multiple processes are unsupported.

use crate::models::SyncState;
use crate::{Error, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted state. A missing file yields an empty state with
    /// `last_sync = None`; malformed content fails fast with a parse error.
    #[tracing::instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<SyncState> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| Error::Parse {
                context: format!("state file {}", self.path.display()),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no prior state; starting empty");
                Ok(SyncState::default())
            }
            Err(e) => Err(Error::backend("read state file", e)),
        }
    }

    /// Atomically overwrite the snapshot: write to a sibling temp file, then
    /// rename over the target, so a crash never leaves a half-written file.
    #[tracing::instrument(level = "debug", skip(self, state), fields(path = %self.path.display()))]
    pub async fn save(&self, state: &SyncState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| Error::Parse {
            context: "serialize state".to_string(),
            source: e,
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::backend("create state directory", e))?;
            }
        }

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| Error::InvalidInput("state path has no file name".to_string()))?;
        let tmp = self
            .path
            .with_file_name(format!("{}.tmp", file_name.to_string_lossy()));

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::backend("write state temp file", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::backend("replace state file", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutcomeStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn missing_file_loads_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let state = store.load().await.unwrap();
        assert!(state.processed_items.is_empty());
        assert!(state.last_sync.is_none());
    }

    #[tokio::test]
    async fn save_then_load_restores_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        let mut state = SyncState::default();
        state.record_outcome("1", "o/r", OutcomeStatus::Failed, Utc::now());
        state.last_sync = Some(Utc::now());
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn malformed_state_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let err = StateStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn save_is_a_full_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut first = SyncState::default();
        first.record_outcome("1", "a/a", OutcomeStatus::Failed, Utc::now());
        store.save(&first).await.unwrap();

        let mut second = SyncState::default();
        second.record_outcome("2", "b/b", OutcomeStatus::Success, Utc::now());
        store.save(&second).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert!(!loaded.processed_items.contains_key("1"));
        assert!(loaded.is_success("2"));
    }
}
