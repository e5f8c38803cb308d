//! Concrete collaborator implementations for the stardocs pipeline:
//! the GitHub source, the DeepWiki workspace provider, the Claude
//! refinement subprocess, and the Feishu notifier.

pub mod claude;
pub mod deepwiki;
pub mod feishu;
pub mod github;

pub use claude::{ClaudeRefiner, ClaudeRefinerConfig};
pub use deepwiki::{DeepWikiConfig, DeepWikiWorkspace};
pub use feishu::FeishuNotifier;
pub use github::GithubClient;
