//! DeepWiki workspace provider.
//!
//! Assembles a per-repository workspace from locally cached DeepWiki
//! documentation, falling back to an external fetch command when no cached
//! copy exists. The workspace receives the overview as `overview.md` and
//! every other document under `docs/`.

use async_trait::async_trait;
use stardocs_core::{sanitize, Error, Result, WorkspaceProvider};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::instrument;

const OVERVIEW_SUFFIX: &str = "Overview.md";

#[derive(Debug, Clone)]
pub struct DeepWikiConfig {
    /// Root of the cached DeepWiki documentation, one subdirectory per repo.
    pub docs_root: PathBuf,
    /// Root under which per-repo workspaces are created.
    pub workspace_root: PathBuf,
    /// Command invoked to fetch docs when no cached copy exists; the repo
    /// name and destination directory are appended as arguments. Empty
    /// disables the fallback.
    pub fetch_command: Vec<String>,
}

pub struct DeepWikiWorkspace {
    config: DeepWikiConfig,
}

impl DeepWikiWorkspace {
    pub fn new(config: DeepWikiConfig) -> Self {
        Self { config }
    }

    /// Find the `*Overview.md` document in a docs directory, if any.
    /// Candidates are sorted so the pick is deterministic.
    async fn find_overview(dir: &Path) -> Result<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::backend("read docs directory", e)),
        };
        let mut candidates = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::backend("scan docs directory", e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(OVERVIEW_SUFFIX) {
                candidates.push(entry.path());
            }
        }
        candidates.sort();
        Ok(candidates.into_iter().next())
    }

    /// Run the configured fetch command (argument vector, no shell). Any
    /// failure is logged and reported as `false`; the caller treats the
    /// repository as unavailable.
    async fn fetch_docs(&self, full_name: &str, dest: &Path) -> bool {
        let Some((program, args)) = self.config.fetch_command.split_first() else {
            tracing::debug!("no fetch command configured");
            return false;
        };
        if let Err(e) = tokio::fs::create_dir_all(dest).await {
            tracing::warn!(error = %e, "could not create docs directory");
            return false;
        }

        tracing::info!(repo = %full_name, program = %program, "fetching docs");
        let output = match Command::new(program)
            .args(args)
            .arg(full_name)
            .arg(dest)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(repo = %full_name, error = %e, "fetch command failed to launch");
                return false;
            }
        };

        if output.status.success() {
            true
        } else {
            tracing::warn!(
                repo = %full_name,
                code = output.status.code().unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "fetch command failed"
            );
            false
        }
    }

    /// Copy every non-overview `.md` document into `dest`.
    async fn copy_docs(docs_dir: &Path, dest: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dest)
            .await
            .map_err(|e| Error::backend("create workspace docs directory", e))?;
        let mut entries = tokio::fs::read_dir(docs_dir)
            .await
            .map_err(|e| Error::backend("read docs directory", e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::backend("scan docs directory", e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".md") || name.contains("Overview") {
                continue;
            }
            tokio::fs::copy(entry.path(), dest.join(&name))
                .await
                .map_err(|e| Error::backend("copy doc into workspace", e))?;
            tracing::debug!(file = %name, "doc copied into workspace");
        }
        Ok(())
    }
}

#[async_trait]
impl WorkspaceProvider for DeepWikiWorkspace {
    #[instrument(level = "info", skip(self))]
    async fn prepare(&self, full_name: &str) -> Result<Option<PathBuf>> {
        let safe_name = sanitize(full_name);
        let work_dir = self.config.workspace_root.join(&safe_name);
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|e| Error::backend("create workspace", e))?;

        let docs_dir = self.config.docs_root.join(&safe_name);
        let mut overview = Self::find_overview(&docs_dir).await?;
        if overview.is_none() {
            if !self.fetch_docs(full_name, &docs_dir).await {
                tracing::warn!(repo = %full_name, "no cached docs and fetch failed");
                return Ok(None);
            }
            overview = Self::find_overview(&docs_dir).await?;
        }
        let Some(overview_path) = overview else {
            tracing::warn!(repo = %full_name, "no overview document available");
            return Ok(None);
        };

        tokio::fs::copy(&overview_path, work_dir.join("overview.md"))
            .await
            .map_err(|e| Error::backend("copy overview into workspace", e))?;
        Self::copy_docs(&docs_dir, &work_dir.join("docs")).await?;

        Ok(Some(work_dir))
    }
}
