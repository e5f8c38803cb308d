//! Claude refinement subprocess.
//!
//! Spawns the refinement binary with a fixed argument vector (never a shell
//! string), feeds the prompt over stdin, and enforces a hard wall-clock
//! timeout. The process reads its inputs from the workspace and writes
//! `final.md` (and optionally `title.txt`) there as a side effect.

use async_trait::async_trait;
use stardocs_core::{Error, Refiner, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::instrument;

/// Stdout of a successful run, persisted into the workspace.
pub const OUTPUT_LOG: &str = "refine_output.log";
/// Stderr of a failed run, persisted into the workspace.
pub const ERROR_LOG: &str = "refine_error.log";

#[derive(Debug, Clone)]
pub struct ClaudeRefinerConfig {
    pub binary: String,
    pub args: Vec<String>,
    /// Hard wall-clock bound on one invocation.
    pub timeout: Duration,
}

impl Default for ClaudeRefinerConfig {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            args: vec![
                "-p".to_string(),
                "--dangerously-skip-permissions".to_string(),
                "--tools".to_string(),
                "Read,Write".to_string(),
            ],
            timeout: Duration::from_secs(1800),
        }
    }
}

pub struct ClaudeRefiner {
    config: ClaudeRefinerConfig,
}

impl ClaudeRefiner {
    pub fn new(config: ClaudeRefinerConfig) -> Result<Self> {
        if config.binary.trim().is_empty() {
            return Err(Error::InvalidInput("refiner binary is empty".to_string()));
        }
        Ok(Self { config })
    }
}

#[async_trait]
impl Refiner for ClaudeRefiner {
    #[instrument(level = "info", skip(self, prompt), fields(workspace = %workspace.display()))]
    async fn invoke(&self, workspace: &Path, prompt: &str) -> Result<()> {
        let mut child = Command::new(&self.config.binary)
            .args(&self.config.args)
            .current_dir(workspace)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Spawn {
                program: self.config.binary.clone(),
                source: e,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::InvalidInput("refiner stdin not captured".to_string()))?;

        // The prompt handoff can block on a full pipe if the child never
        // drains stdin, so the wall-clock timeout must cover the write as
        // well as the wait. On timeout the interaction future is dropped,
        // and kill_on_drop reaps the process.
        let interaction = async {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| Error::backend("write prompt to refiner", e))?;
            drop(stdin);
            child
                .wait_with_output()
                .await
                .map_err(|e| Error::backend("wait for refiner", e))
        };
        let output = tokio::time::timeout(self.config.timeout, interaction)
            .await
            .map_err(|_| Error::Timeout {
                seconds: self.config.timeout.as_secs(),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            if let Err(e) = tokio::fs::write(workspace.join(OUTPUT_LOG), stdout.as_bytes()).await {
                tracing::warn!(error = %e, "could not persist refiner output log");
            }
            tracing::info!("refinement process completed");
            Ok(())
        } else {
            let exit_code = output.status.code().unwrap_or(-1);
            if let Err(e) = tokio::fs::write(workspace.join(OUTPUT_LOG), stdout.as_bytes()).await {
                tracing::warn!(error = %e, "could not persist refiner output log");
            }
            if let Err(e) = tokio::fs::write(workspace.join(ERROR_LOG), stderr.as_bytes()).await {
                tracing::warn!(error = %e, "could not persist refiner error log");
            }
            tracing::error!(exit_code, "refinement process failed");
            Err(Error::RefinementFailed { exit_code })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refiner(binary: &str, args: Vec<&str>) -> ClaudeRefiner {
        ClaudeRefiner::new(ClaudeRefinerConfig {
            binary: binary.to_string(),
            args: args.into_iter().map(String::from).collect(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn zero_exit_succeeds_and_persists_stdout() {
        let dir = tempfile::tempdir().unwrap();
        // Consumes the prompt from stdin and echoes a line, like the real
        // binary does.
        let r = refiner("sh", vec!["-c", "cat > /dev/null; echo done"]);
        r.invoke(dir.path(), "prompt").await.unwrap();

        let log = tokio::fs::read_to_string(dir.path().join(OUTPUT_LOG))
            .await
            .unwrap();
        assert_eq!(log.trim(), "done");
    }

    #[tokio::test]
    async fn nonzero_exit_is_permanent_and_persists_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let r = refiner("sh", vec!["-c", "cat > /dev/null; echo boom >&2; exit 3"]);
        let err = r.invoke(dir.path(), "prompt").await.unwrap_err();
        assert!(matches!(err, Error::RefinementFailed { exit_code: 3 }));
        assert!(!err.is_transient());

        let log = tokio::fs::read_to_string(dir.path().join(ERROR_LOG))
            .await
            .unwrap();
        assert_eq!(log.trim(), "boom");
    }

    #[tokio::test]
    async fn missing_binary_is_a_transient_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let r = refiner("stardocs-no-such-binary", vec![]);
        let err = r.invoke(dir.path(), "prompt").await.unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn timeout_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        let r = ClaudeRefiner::new(ClaudeRefinerConfig {
            binary: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 30".to_string()],
            timeout: Duration::from_millis(100),
        })
        .unwrap();
        let err = r.invoke(dir.path(), "prompt").await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn timeout_covers_prompt_handoff_when_child_ignores_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let r = ClaudeRefiner::new(ClaudeRefinerConfig {
            binary: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 3".to_string()],
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        // A prompt far larger than the pipe buffer, so the write itself
        // blocks against a child that never reads stdin.
        let prompt = "x".repeat(2 * 1024 * 1024);
        let started = std::time::Instant::now();
        let err = r.invoke(dir.path(), &prompt).await.unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
        assert!(err.is_transient());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
