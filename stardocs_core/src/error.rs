use std::error::Error as StdError;

/// Common error type for `stardocs_core`.
///
/// Integrations (GitHub, DeepWiki, the refinement subprocess) should preserve
/// the underlying error chain where possible via `Error::backend` /
/// `Error::network`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No workspace could be prepared for the repository; the item fails.
    #[error("no workspace available for repository: {0}")]
    WorkspaceUnavailable(String),

    /// The refinement process finished without producing its artifact.
    #[error("refined artifact not found: {0}")]
    ArtifactMissing(String),

    /// The refinement process completed with a nonzero exit status.
    /// Its stdout/stderr are persisted as diagnostics inside the workspace.
    #[error("refinement process exited with code {exit_code}")]
    RefinementFailed { exit_code: i32 },

    /// A wall-clock timeout elapsed while waiting on an external operation.
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// An OS-level failure launching an external process.
    #[error("failed to launch {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A network-level failure talking to an external API.
    #[error("network error: {context}")]
    Network {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    /// A retried operation exhausted its attempt budget.
    #[error("{operation} failed after {attempts} attempts")]
    OperationFailed {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    /// Malformed persisted state. Fails fast rather than silently defaulting.
    #[error("parse error: {context}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend error: {context}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl Error {
    pub fn backend(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn network(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether this failure is expected to clear on its own and is safe to
    /// retry (network failure, timeout, OS-level launch failure). Everything
    /// else is permanent for the current invocation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Spawn { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
