//! Feishu webhook notifier.
//!
//! Best-effort, fire-and-forget: the pipeline swallows any error returned
//! here. An unset or placeholder webhook URL disables notifications.

use async_trait::async_trait;
use reqwest::Client;
use stardocs_core::{Error, Notifier, Result};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

const PLACEHOLDER_SUFFIX: &str = "YOUR_WEBHOOK_URL";

pub struct FeishuNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl FeishuNotifier {
    pub fn new(webhook_url: Option<String>) -> Result<Self> {
        let webhook_url = webhook_url
            .filter(|url| !url.trim().is_empty() && !url.ends_with(PLACEHOLDER_SUFFIX));
        if webhook_url.is_none() {
            tracing::warn!("feishu webhook not configured; notifications disabled");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::backend("build http client", e))?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn success_text(name: &str, title: &str, path: &Path, description: &str) -> String {
        let description = if description.is_empty() {
            "-"
        } else {
            description
        };
        format!(
            "\u{2705} Document generated\n\nRepo: {name}\nTitle: {title}\nDescription: {description}\nFile: {}",
            path.display()
        )
    }

    fn failure_text(name: &str, error: &str) -> String {
        format!("\u{274c} Document generation failed\n\nRepo: {name}\nError: {error}")
    }

    async fn post(&self, text: String) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };
        let payload = serde_json::json!({
            "msg_type": "text",
            "content": { "text": text },
        });
        self.client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::network("send feishu notification", e))?
            .error_for_status()
            .map_err(|e| Error::network("feishu webhook rejected notification", e))?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    #[instrument(level = "debug", skip(self, path, description))]
    async fn notify_success(
        &self,
        name: &str,
        title: &str,
        path: &Path,
        description: &str,
    ) -> Result<()> {
        self.post(Self::success_text(name, title, path, description))
            .await?;
        tracing::info!(repo = %name, "success notification sent");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, error))]
    async fn notify_failure(&self, name: &str, error: &str) -> Result<()> {
        self.post(Self::failure_text(name, error)).await?;
        tracing::info!(repo = %name, "failure notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn placeholder_and_empty_urls_disable_notifications() {
        assert!(!FeishuNotifier::new(None).unwrap().is_enabled());
        assert!(!FeishuNotifier::new(Some(String::new())).unwrap().is_enabled());
        assert!(!FeishuNotifier::new(Some(
            "https://open.feishu.cn/open-apis/bot/v2/hook/YOUR_WEBHOOK_URL".to_string()
        ))
        .unwrap()
        .is_enabled());
        assert!(FeishuNotifier::new(Some(
            "https://open.feishu.cn/open-apis/bot/v2/hook/abc123".to_string()
        ))
        .unwrap()
        .is_enabled());
    }

    #[tokio::test]
    async fn disabled_notifier_is_a_no_op() {
        let n = FeishuNotifier::new(None).unwrap();
        n.notify_success("o/r", "T", &PathBuf::from("/tmp/o_r.md"), "d")
            .await
            .unwrap();
        n.notify_failure("o/r", "boom").await.unwrap();
    }

    #[test]
    fn success_text_carries_all_fields() {
        let text =
            FeishuNotifier::success_text("o/r", "T", &PathBuf::from("/docs/o_r_T.md"), "desc");
        assert!(text.contains("Repo: o/r"));
        assert!(text.contains("Title: T"));
        assert!(text.contains("Description: desc"));
        assert!(text.contains("File: /docs/o_r_T.md"));
    }

    #[test]
    fn empty_description_renders_dash() {
        let text = FeishuNotifier::success_text("o/r", "T", &PathBuf::from("p"), "");
        assert!(text.contains("Description: -"));
    }
}
