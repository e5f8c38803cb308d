//! Pass orchestration: reconciliation, discovery, backfill, and the poll
//! loop.
//!
//! Exactly one repository is processed at a time. Within a pass,
//! reconciliation strictly completes before discovery begins; discovered
//! items are processed in the order the source returns them. The state
//! snapshot is persisted after every item, never batched across a pass, so
//! a crash loses at most the in-flight item's update.

use crate::config::SyncConfig;
use crate::models::{OutcomeStatus, StarredRepo, SyncState};
use crate::state::StateStore;
use crate::sync::traits::{RepoProcessor, RepoSource};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;

/// Entry mode for [`SyncScheduler::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Repeat normal passes forever.
    Poll,
    /// Run one backfill pass over the full starred history, then poll.
    BackfillThenPoll,
}

pub struct SyncScheduler {
    source: Arc<dyn RepoSource>,
    processor: Arc<dyn RepoProcessor>,
    store: StateStore,
    config: SyncConfig,
}

impl SyncScheduler {
    pub fn new(
        source: Arc<dyn RepoSource>,
        processor: Arc<dyn RepoProcessor>,
        store: StateStore,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            processor,
            store,
            config,
        }
    }

    /// Run until externally terminated. Pass-level errors are logged so one
    /// bad pass never halts future passes; only a failure to load the state
    /// snapshot at startup aborts.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn run(&self, mode: RunMode) -> Result<()> {
        let mut state = self.store.load().await?;
        tracing::info!(
            known = state.processed_items.len(),
            poll_interval_s = self.config.poll_interval.as_secs(),
            "scheduler started"
        );

        if mode == RunMode::BackfillThenPoll {
            if let Err(e) = self.backfill(&mut state).await {
                tracing::error!(error = %e, "backfill pass failed");
            }
        }

        let mut pass = 0u64;
        loop {
            pass += 1;
            tracing::info!(pass, "starting sync pass");
            if let Err(e) = self.pass(&mut state).await {
                tracing::error!(error = %e, pass, "sync pass failed");
            }
            tracing::info!(
                pass,
                sleep_s = self.config.poll_interval.as_secs(),
                "sync pass complete"
            );
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// One normal pass: reconcile previously-failed items, then process
    /// newly discovered ones.
    pub async fn pass(&self, state: &mut SyncState) -> Result<()> {
        self.reconcile(state).await?;
        self.discover(state).await?;
        Ok(())
    }

    /// Re-run every repository currently recorded as failed, in ascending
    /// id order. A repository that cannot be re-resolved is skipped for the
    /// pass and stays failed; it does not count as an attempt.
    #[tracing::instrument(level = "info", skip_all)]
    async fn reconcile(&self, state: &mut SyncState) -> Result<()> {
        let failed = state.failed_items();
        if failed.is_empty() {
            tracing::debug!("no failed repositories to reconcile");
            return Ok(());
        }
        tracing::info!(count = failed.len(), "reconciling failed repositories");

        for (id, name) in failed {
            let repo = match self.source.resolve(&name).await {
                Ok(repo) => repo,
                Err(e) => {
                    tracing::warn!(
                        repo = %name,
                        id = %id,
                        error = %e,
                        "could not re-resolve failed repository; leaving for next pass"
                    );
                    continue;
                }
            };
            self.process_and_record(&repo, state).await?;
            tokio::time::sleep(self.config.inter_item_delay).await;
        }
        Ok(())
    }

    /// Fetch the most recent stars and process any whose record is absent
    /// or not success, in source order.
    #[tracing::instrument(level = "info", skip_all)]
    async fn discover(&self, state: &mut SyncState) -> Result<()> {
        let recent = self.source.get_recent(self.config.recent_limit).await?;
        tracing::info!(count = recent.len(), "fetched recent starred repositories");

        for repo in recent {
            if state.is_success(&repo.id) {
                tracing::debug!(repo = %repo.full_name, "already processed; skipping");
                continue;
            }
            self.process_and_record(&repo, state).await?;
        }
        Ok(())
    }

    /// One-time pass over the full starred history, with the same
    /// absent-or-not-success filter as discovery and the bulk inter-item
    /// pause.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn backfill(&self, state: &mut SyncState) -> Result<()> {
        let all = self.source.get_all().await?;
        tracing::info!(count = all.len(), "backfilling full starred history");

        for repo in all {
            if state.is_success(&repo.id) {
                continue;
            }
            self.process_and_record(&repo, state).await?;
            tokio::time::sleep(self.config.inter_item_delay).await;
        }
        Ok(())
    }

    /// Process one repository and persist its outcome before the next item
    /// begins.
    async fn process_and_record(&self, repo: &StarredRepo, state: &mut SyncState) -> Result<()> {
        let ok = self.processor.process(repo).await;
        let status = if ok {
            OutcomeStatus::Success
        } else {
            OutcomeStatus::Failed
        };
        let now = Utc::now();
        state.record_outcome(&repo.id, &repo.full_name, status, now);
        state.last_sync = Some(now);
        self.store.save(state).await?;

        match status {
            OutcomeStatus::Success => {
                tracing::info!(repo = %repo.full_name, "repository processed")
            }
            OutcomeStatus::Failed => {
                tracing::warn!(repo = %repo.full_name, "repository failed; will retry next pass")
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeSource {
        recent: Vec<StarredRepo>,
        all: Vec<StarredRepo>,
        resolvable: HashMap<String, StarredRepo>,
    }

    impl FakeSource {
        fn empty() -> Self {
            Self {
                recent: Vec::new(),
                all: Vec::new(),
                resolvable: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl RepoSource for FakeSource {
        async fn get_recent(&self, limit: usize) -> Result<Vec<StarredRepo>> {
            Ok(self.recent.iter().take(limit).cloned().collect())
        }

        async fn get_all(&self) -> Result<Vec<StarredRepo>> {
            Ok(self.all.clone())
        }

        async fn resolve(&self, full_name: &str) -> Result<StarredRepo> {
            self.resolvable.get(full_name).cloned().ok_or_else(|| {
                Error::network(
                    "resolve repository",
                    std::io::Error::new(std::io::ErrorKind::Other, "unreachable"),
                )
            })
        }
    }

    struct FakeProcessor {
        result: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProcessor {
        fn returning(result: bool) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RepoProcessor for FakeProcessor {
        async fn process(&self, repo: &StarredRepo) -> bool {
            self.calls.lock().unwrap().push(repo.full_name.clone());
            self.result
        }
    }

    fn repo(id: &str, name: &str) -> StarredRepo {
        StarredRepo::new(id, name, "").unwrap()
    }

    fn test_config() -> SyncConfig {
        SyncConfig {
            inter_item_delay: Duration::ZERO,
            ..SyncConfig::default()
        }
    }

    fn scheduler(
        source: FakeSource,
        processor: Arc<FakeProcessor>,
        dir: &tempfile::TempDir,
    ) -> SyncScheduler {
        SyncScheduler::new(
            Arc::new(source),
            processor,
            StateStore::new(dir.path().join("state.json")),
            test_config(),
        )
    }

    #[tokio::test]
    async fn successful_record_is_never_reprocessed() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::empty();
        source.recent = vec![repo("1", "o/r")];
        let processor = FakeProcessor::returning(true);
        let sched = scheduler(source, processor.clone(), &dir);

        let mut state = SyncState::default();
        state.record_outcome("1", "o/r", OutcomeStatus::Success, Utc::now());

        sched.pass(&mut state).await.unwrap();
        assert_eq!(processor.call_count(), 0);
        assert!(state.is_success("1"));
    }

    #[tokio::test]
    async fn failed_record_is_reconciled_to_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::empty();
        source
            .resolvable
            .insert("o/r".to_string(), repo("1", "o/r"));
        let processor = FakeProcessor::returning(true);
        let sched = scheduler(source, processor.clone(), &dir);

        let mut state = SyncState::default();
        state.record_outcome("1", "o/r", OutcomeStatus::Failed, Utc::now());

        sched.pass(&mut state).await.unwrap();
        assert_eq!(processor.call_count(), 1);
        assert!(state.is_success("1"));

        // Outcome was persisted, not just held in memory.
        let persisted = StateStore::new(dir.path().join("state.json"))
            .load()
            .await
            .unwrap();
        assert!(persisted.is_success("1"));
    }

    #[tokio::test]
    async fn unresolvable_failed_record_is_skipped_and_stays_failed() {
        let dir = tempfile::tempdir().unwrap();
        let processor = FakeProcessor::returning(true);
        let sched = scheduler(FakeSource::empty(), processor.clone(), &dir);

        let mut state = SyncState::default();
        state.record_outcome("1", "gone/repo", OutcomeStatus::Failed, Utc::now());

        sched.pass(&mut state).await.unwrap();
        assert_eq!(processor.call_count(), 0);
        assert_eq!(
            state.processed_items["1"].status,
            OutcomeStatus::Failed
        );
    }

    #[tokio::test]
    async fn discovery_processes_new_items_in_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::empty();
        source.recent = vec![repo("2", "b/b"), repo("1", "a/a")];
        let processor = FakeProcessor::returning(true);
        let sched = scheduler(source, processor.clone(), &dir);

        let mut state = SyncState::default();
        sched.pass(&mut state).await.unwrap();

        let calls = processor.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["b/b".to_string(), "a/a".to_string()]);
        assert!(state.is_success("1"));
        assert!(state.is_success("2"));
        assert!(state.last_sync.is_some());
    }

    #[tokio::test]
    async fn discovery_retries_failed_items_too() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::empty();
        source.recent = vec![repo("1", "o/r")];
        // Not resolvable, so reconciliation skips it; discovery picks it up.
        let processor = FakeProcessor::returning(true);
        let sched = scheduler(source, processor.clone(), &dir);

        let mut state = SyncState::default();
        state.record_outcome("1", "o/r", OutcomeStatus::Failed, Utc::now());

        sched.pass(&mut state).await.unwrap();
        assert_eq!(processor.call_count(), 1);
        assert!(state.is_success("1"));
    }

    #[tokio::test]
    async fn failed_processing_records_failed_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::empty();
        source.recent = vec![repo("1", "o/r")];
        let processor = FakeProcessor::returning(false);
        let sched = scheduler(source, processor.clone(), &dir);

        let mut state = SyncState::default();
        sched.pass(&mut state).await.unwrap();
        assert_eq!(
            state.processed_items["1"].status,
            OutcomeStatus::Failed
        );
    }

    #[tokio::test]
    async fn backfill_skips_recorded_successes() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::empty();
        source.all = vec![repo("1", "a/a"), repo("2", "b/b"), repo("3", "c/c")];
        let processor = FakeProcessor::returning(true);
        let sched = scheduler(source, processor.clone(), &dir);

        let mut state = SyncState::default();
        state.record_outcome("2", "b/b", OutcomeStatus::Success, Utc::now());

        sched.backfill(&mut state).await.unwrap();
        let calls = processor.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["a/a".to_string(), "c/c".to_string()]);
    }
}
