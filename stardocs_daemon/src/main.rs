mod cli;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use stardocs_core::{
    ContentProvider, PipelineExecutor, RepoSource, RunMode, StateStore, SyncConfig, SyncScheduler,
};
use stardocs_integrations::{
    ClaudeRefiner, ClaudeRefinerConfig, DeepWikiConfig, DeepWikiWorkspace, FeishuNotifier,
    GithubClient,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let prompt_template = tokio::fs::read_to_string(&cli.prompt_template)
        .await
        .with_context(|| format!("read prompt template {}", cli.prompt_template.display()))?;

    let config = SyncConfig {
        output_dir: cli.output_dir,
        mirror_dir: cli.mirror_dir,
        prompt_template,
        poll_interval: Duration::from_secs(cli.poll_interval_secs),
        recent_limit: cli.recent_limit,
        ..SyncConfig::default()
    };

    let github = Arc::new(GithubClient::new(cli.github_token)?);
    let workspace = Arc::new(DeepWikiWorkspace::new(DeepWikiConfig {
        docs_root: cli.docs_root,
        workspace_root: cli.workspace_root,
        fetch_command: cli.fetch_command,
    }));
    let refiner = Arc::new(ClaudeRefiner::new(ClaudeRefinerConfig {
        binary: cli.refiner_bin,
        timeout: Duration::from_secs(cli.refine_timeout_secs),
        ..ClaudeRefinerConfig::default()
    })?);
    let notifier = Arc::new(FeishuNotifier::new(cli.feishu_webhook)?);

    let executor = Arc::new(PipelineExecutor::new(
        workspace,
        github.clone() as Arc<dyn ContentProvider>,
        refiner,
        notifier,
        config.clone(),
    ));
    let store = StateStore::new(cli.state_file);
    let scheduler = SyncScheduler::new(
        github as Arc<dyn RepoSource>,
        executor,
        store,
        config,
    );

    let mode = if cli.backfill {
        RunMode::BackfillThenPoll
    } else {
        RunMode::Poll
    };
    tracing::info!(?mode, "stardocs daemon starting");
    scheduler.run(mode).await?;
    Ok(())
}
