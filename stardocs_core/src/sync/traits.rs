use crate::models::StarredRepo;
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Discovers repositories. Network calls may fail transiently; callers wrap
/// them in the retry primitive where appropriate.
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// The most recently starred repositories, newest first.
    async fn get_recent(&self, limit: usize) -> Result<Vec<StarredRepo>>;

    /// The full starred history (used by backfill).
    async fn get_all(&self) -> Result<Vec<StarredRepo>>;

    /// Re-resolve current repository data by `owner/repo` name.
    async fn resolve(&self, full_name: &str) -> Result<StarredRepo>;
}

/// Supplies supplementary text (the repository README). Absence is not an
/// error.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn supplementary(&self, full_name: &str) -> Result<Option<String>>;
}

/// Prepares a per-repository workspace directory.
///
/// `None` means no workspace could be assembled for this repository, which
/// is unrecoverable for the current pipeline run.
#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    async fn prepare(&self, full_name: &str) -> Result<Option<PathBuf>>;
}

/// Runs the external long-running refinement process over a workspace.
///
/// By convention the process reads its inputs from, and writes its artifact
/// (and optionally a title) to, fixed relative paths inside the workspace.
/// `Ok(())` means the process completed with a zero exit status. Timeouts
/// and launch failures surface as transient errors; a completed nonzero
/// exit is permanent for the invocation.
#[async_trait]
pub trait Refiner: Send + Sync {
    async fn invoke(&self, workspace: &Path, prompt: &str) -> Result<()>;
}

/// Best-effort, fire-and-forget notifications. Failures never affect the
/// item's recorded outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_success(
        &self,
        name: &str,
        title: &str,
        path: &Path,
        description: &str,
    ) -> Result<()>;

    async fn notify_failure(&self, name: &str, error: &str) -> Result<()>;
}

/// The scheduler-facing view of the pipeline: process one repository to a
/// terminal outcome, isolating its failure.
#[async_trait]
pub trait RepoProcessor: Send + Sync {
    /// Returns true iff the artifact was published.
    async fn process(&self, repo: &StarredRepo) -> bool;
}
