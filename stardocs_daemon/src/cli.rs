use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "stardocs",
    version,
    about = "Watches starred GitHub repositories, refines their docs through an external agent, and publishes the result"
)]
pub struct Cli {
    /// Process the full starred history once before entering the poll loop.
    #[arg(long)]
    pub backfill: bool,

    /// GitHub API token used for starred-repo listing and README retrieval.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Directory under which per-repo workspaces are created.
    #[arg(
        long,
        env = "STARDOCS_WORKSPACE_ROOT",
        default_value = ".stardocs/workspace"
    )]
    pub workspace_root: PathBuf,

    /// Directory holding cached DeepWiki documentation, one subdir per repo.
    #[arg(long, env = "STARDOCS_DOCS_ROOT", default_value = ".stardocs/docs")]
    pub docs_root: PathBuf,

    /// Command run to fetch DeepWiki docs when no cached copy exists; the
    /// repo name and destination directory are appended. Empty disables the
    /// fallback.
    #[arg(
        long,
        env = "STARDOCS_FETCH_COMMAND",
        value_delimiter = ' ',
        default_value = "mcp call deepwiki fetch-and-save"
    )]
    pub fetch_command: Vec<String>,

    /// Directory where final refined documents are written.
    #[arg(
        long,
        env = "STARDOCS_OUTPUT_DIR",
        default_value = ".stardocs/final_docs"
    )]
    pub output_dir: PathBuf,

    /// Optional secondary directory that mirrors every published document.
    #[arg(long, env = "STARDOCS_MIRROR_DIR")]
    pub mirror_dir: Option<PathBuf>,

    /// Path of the JSON state snapshot.
    #[arg(long, env = "STARDOCS_STATE_FILE", default_value = ".stardocs/state.json")]
    pub state_file: PathBuf,

    /// Seconds to sleep between sync passes.
    #[arg(long, env = "POLL_INTERVAL", default_value = "60")]
    pub poll_interval_secs: u64,

    /// Number of recent stars fetched per pass.
    #[arg(long, env = "STARDOCS_RECENT_LIMIT", default_value = "10")]
    pub recent_limit: usize,

    /// Prompt template file; `{WORK_DIR}` is replaced with the workspace
    /// path for each run.
    #[arg(long, env = "STARDOCS_PROMPT_TEMPLATE", default_value = "PROMPT.md")]
    pub prompt_template: PathBuf,

    /// Refinement binary invoked per repository.
    #[arg(long, env = "STARDOCS_REFINER_BIN", default_value = "claude")]
    pub refiner_bin: String,

    /// Wall-clock timeout for one refinement run, in seconds.
    #[arg(long, env = "STARDOCS_REFINE_TIMEOUT", default_value = "1800")]
    pub refine_timeout_secs: u64,

    /// Feishu webhook URL; unset disables notifications.
    #[arg(long, env = "FEISHU_WEBHOOK_URL", hide_env_values = true)]
    pub feishu_webhook: Option<String>,
}
