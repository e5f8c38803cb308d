//! stardocs core library: the stateful synchronization pipeline.
//!
//! Discovers starred repositories through a `RepoSource`, drives each one
//! through a fixed five-stage pipeline (workspace, README, refinement,
//! publication, notification), and records per-repo outcomes in a durable
//! JSON snapshot so repeated passes are idempotent and only failed items
//! are retried.

pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod state;
pub mod sync;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use models::{OutcomeRecord, OutcomeStatus, StarredRepo, SyncState};
pub use retry::{retry_with_policy, RetryPolicy};
pub use state::StateStore;
pub use sync::pipeline::{sanitize, PipelineExecutor, PublishedArtifact};
pub use sync::scheduler::{RunMode, SyncScheduler};
pub use sync::traits::{
    ContentProvider, Notifier, Refiner, RepoProcessor, RepoSource, WorkspaceProvider,
};
