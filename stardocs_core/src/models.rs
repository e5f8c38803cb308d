use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A repository discovered from the source.
///
/// Immutable once fetched; re-fetched fresh on every pipeline run, never
/// cached across runs. Only `id` and `full_name` are retained in persisted
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarredRepo {
    /// Stable source-assigned identifier.
    pub id: String,
    /// `owner/repo`, the human key used for external lookups and filenames.
    pub full_name: String,
    #[serde(default)]
    pub description: String,
}

impl StarredRepo {
    pub fn new(
        id: impl Into<String>,
        full_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("repository id is empty".to_string()));
        }
        let full_name = full_name.into();
        if full_name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "repository full_name is empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            full_name,
            description: description.into(),
        })
    }
}

/// Terminal outcome of one pipeline run for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// Persisted per-repository outcome, keyed by `StarredRepo.id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub name: String,
    pub status: OutcomeStatus,
    pub timestamp: DateTime<Utc>,
}

/// The full durable state snapshot.
///
/// A `BTreeMap` keeps reconciliation order deterministic: failed items are
/// always revisited in ascending lexicographic order of repository id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub processed_items: BTreeMap<String, OutcomeRecord>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncState {
    /// Whether the repository already has a recorded success and must be
    /// skipped by discovery and backfill.
    pub fn is_success(&self, id: &str) -> bool {
        self.processed_items
            .get(id)
            .map(|r| r.status == OutcomeStatus::Success)
            .unwrap_or(false)
    }

    /// All `(id, name)` pairs currently recorded as failed, in ascending id
    /// order.
    pub fn failed_items(&self) -> Vec<(String, String)> {
        self.processed_items
            .iter()
            .filter(|(_, r)| r.status == OutcomeStatus::Failed)
            .map(|(id, r)| (id.clone(), r.name.clone()))
            .collect()
    }

    /// Upsert an outcome. A recorded `Success` never regresses to `Failed`.
    pub fn record_outcome(
        &mut self,
        id: &str,
        name: &str,
        status: OutcomeStatus,
        timestamp: DateTime<Utc>,
    ) {
        if let Some(existing) = self.processed_items.get(id) {
            if existing.status == OutcomeStatus::Success && status == OutcomeStatus::Failed {
                tracing::warn!(
                    repo = %name,
                    "ignoring status regression from success to failed"
                );
                return;
            }
        }
        self.processed_items.insert(
            id.to_string(),
            OutcomeRecord {
                name: name.to_string(),
                status,
                timestamp,
            },
        );
    }
}
