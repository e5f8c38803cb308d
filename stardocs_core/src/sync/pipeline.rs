//! Five-stage pipeline for one repository.
//!
//! 1. Acquire workspace
//! 2. Fetch supplementary README (absence is non-fatal)
//! 3. Invoke the refinement process (retried on transient failures)
//! 4. Publish the refined artifact with a metadata header
//! 5. Notify (best-effort, never affects the outcome)
//!
//! Any error in stages 1-3 short-circuits the item to failure; the item
//! remains eligible for retry at the next reconciliation pass.

use crate::config::SyncConfig;
use crate::models::StarredRepo;
use crate::retry::retry_with_policy;
use crate::sync::traits::{ContentProvider, Notifier, Refiner, RepoProcessor, WorkspaceProvider};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supplementary text is written here inside the workspace before refinement.
pub const README_FILE: &str = "README.md";
/// The refinement process writes its finalized artifact here.
pub const ARTIFACT_FILE: &str = "final.md";
/// Optional refiner-produced title.
pub const TITLE_FILE: &str = "title.txt";

/// Replace filesystem-unsafe characters with `_`. Deterministic: identical
/// input always yields identical output.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}

/// A successfully published artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedArtifact {
    pub path: PathBuf,
    pub title: String,
}

/// Runs the fixed stage sequence for one repository, isolating its failure.
pub struct PipelineExecutor {
    workspace: Arc<dyn WorkspaceProvider>,
    content: Arc<dyn ContentProvider>,
    refiner: Arc<dyn Refiner>,
    notifier: Arc<dyn Notifier>,
    config: SyncConfig,
}

impl PipelineExecutor {
    pub fn new(
        workspace: Arc<dyn WorkspaceProvider>,
        content: Arc<dyn ContentProvider>,
        refiner: Arc<dyn Refiner>,
        notifier: Arc<dyn Notifier>,
        config: SyncConfig,
    ) -> Self {
        Self {
            workspace,
            content,
            refiner,
            notifier,
            config,
        }
    }

    /// Stages 1-4. Any error fails the item.
    #[tracing::instrument(level = "info", skip(self, repo), fields(repo = %repo.full_name))]
    async fn run_stages(&self, repo: &StarredRepo) -> Result<PublishedArtifact> {
        // Stage 1: workspace. `None` is unrecoverable for this run.
        let Some(workspace) = self.workspace.prepare(&repo.full_name).await? else {
            return Err(Error::WorkspaceUnavailable(repo.full_name.clone()));
        };
        tracing::info!(workspace = %workspace.display(), "workspace prepared");

        // Stage 2: supplementary README. Absence becomes an empty file.
        let readme = self
            .content
            .supplementary(&repo.full_name)
            .await?
            .unwrap_or_default();
        tokio::fs::write(workspace.join(README_FILE), &readme)
            .await
            .map_err(|e| Error::backend("write workspace README", e))?;
        tracing::info!(bytes = readme.len(), "supplementary README saved");

        // Stage 3: refinement. Only launch/timeout failures are retried;
        // a completed nonzero exit is permanent for this invocation.
        let prompt = self
            .config
            .prompt_template
            .replace("{WORK_DIR}", &workspace.display().to_string());
        retry_with_policy(
            &self.config.refine_retry,
            "refinement process",
            Error::is_transient,
            || self.refiner.invoke(&workspace, &prompt),
        )
        .await?;

        // Stage 4: publish.
        let artifact_path = workspace.join(ARTIFACT_FILE);
        let body = match tokio::fs::read_to_string(&artifact_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ArtifactMissing(artifact_path.display().to_string()));
            }
            Err(e) => return Err(Error::backend("read refined artifact", e)),
        };
        let title = match tokio::fs::read_to_string(workspace.join(TITLE_FILE)).await {
            Ok(raw) => {
                let trimmed = raw.trim().to_string();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(Error::backend("read artifact title", e)),
        };

        self.publish(repo, title, &body).await
    }

    /// Compose the metadata header, write under the output dir, and mirror
    /// best-effort.
    async fn publish(
        &self,
        repo: &StarredRepo,
        title: Option<String>,
        body: &str,
    ) -> Result<PublishedArtifact> {
        let display_title = title.clone().unwrap_or_else(|| repo.full_name.clone());

        let mut file_name = sanitize(&repo.full_name);
        if let Some(t) = &title {
            file_name.push('_');
            file_name.push_str(&sanitize(t));
        }
        file_name.push_str(".md");

        let generated_at = Utc::now().format("%Y-%m-%d %H:%M:%S");
        let content = format!(
            "---\ntitle: {display_title}\nrepo: {}\ngenerated_at: {generated_at}\n---\n\n{body}",
            repo.full_name
        );

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| Error::backend("create output directory", e))?;
        let dest = self.config.output_dir.join(&file_name);
        tokio::fs::write(&dest, &content)
            .await
            .map_err(|e| Error::backend("write refined document", e))?;
        tracing::info!(path = %dest.display(), "refined document published");

        if let Some(mirror_dir) = &self.config.mirror_dir {
            if let Err(e) = mirror_copy(mirror_dir, &file_name, &content).await {
                tracing::warn!(
                    mirror = %mirror_dir.display(),
                    error = %e,
                    "mirror copy failed; document remains published"
                );
            }
        }

        Ok(PublishedArtifact {
            path: dest,
            title: display_title,
        })
    }
}

async fn mirror_copy(dir: &Path, file_name: &str, content: &str) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::backend("create mirror directory", e))?;
    tokio::fs::write(dir.join(file_name), content)
        .await
        .map_err(|e| Error::backend("write mirror copy", e))?;
    Ok(())
}

#[async_trait]
impl RepoProcessor for PipelineExecutor {
    /// Run all stages and emit the matching notification. Returns true iff
    /// the artifact was published. Notification failures are swallowed.
    #[tracing::instrument(level = "info", skip(self, repo), fields(repo = %repo.full_name))]
    async fn process(&self, repo: &StarredRepo) -> bool {
        match self.run_stages(repo).await {
            Ok(artifact) => {
                if let Err(e) = self
                    .notifier
                    .notify_success(
                        &repo.full_name,
                        &artifact.title,
                        &artifact.path,
                        &repo.description,
                    )
                    .await
                {
                    tracing::warn!(error = %e, "success notification failed");
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "pipeline failed");
                if let Err(ne) = self.notifier.notify_failure(&repo.full_name, &e.to_string()).await
                {
                    tracing::warn!(error = %ne, "failure notification failed");
                }
                false
            }
        }
    }
}
