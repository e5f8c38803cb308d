use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable process configuration, built once at startup and passed
/// explicitly into the scheduler and pipeline executor constructors.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory where final refined documents are written.
    pub output_dir: PathBuf,
    /// Optional secondary location that mirrors every published document.
    /// Mirroring failures are logged but never fail the item.
    pub mirror_dir: Option<PathBuf>,
    /// Prompt template handed to the refiner; `{WORK_DIR}` is replaced with
    /// the workspace path.
    pub prompt_template: String,
    /// Retry policy for the refinement subprocess (transient launch/timeout
    /// failures only).
    pub refine_retry: RetryPolicy,
    /// Sleep between sync passes.
    pub poll_interval: Duration,
    /// Number of recent stars fetched per pass.
    pub recent_limit: usize,
    /// Fixed pause between items during bulk passes (reconciliation and
    /// backfill), to respect source rate limits.
    pub inter_item_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(".stardocs/final_docs"),
            mirror_dir: None,
            prompt_template: String::new(),
            refine_retry: RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_secs(5),
                backoff_multiplier: 1.0,
            },
            poll_interval: Duration::from_secs(60),
            recent_limit: 10,
            inter_item_delay: Duration::from_secs(2),
        }
    }
}
