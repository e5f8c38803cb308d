//! GitHub source.
//!
//! Lists the authenticated user's starred repositories (recent and full
//! history) over REST API v3 and retrieves READMEs through the contents
//! endpoint.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use stardocs_core::{retry_with_policy, ContentProvider, Error, RepoSource, Result, RetryPolicy, StarredRepo};
use std::time::Duration;
use tracing::instrument;

const PAGE_SIZE: usize = 100;
/// README filename fallbacks, tried in order.
const README_CANDIDATES: &[&str] = &["README.md", "README.zh.md", "README.zh-CN.md"];

#[derive(Debug, Deserialize, Clone)]
struct RepoPayload {
    id: u64,
    full_name: String,
    #[serde(default)]
    description: Option<String>,
}

impl RepoPayload {
    fn into_repo(self) -> Result<StarredRepo> {
        StarredRepo::new(
            self.id.to_string(),
            self.full_name,
            self.description.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ContentsPayload {
    content: String,
}

/// Decode a contents-API payload. GitHub wraps base64 at 60 columns, so
/// embedded newlines are stripped first.
fn decode_contents(content: &str) -> Result<String> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| Error::backend("decode readme base64", e))?;
    String::from_utf8(bytes).map_err(|e| Error::backend("readme is not utf-8", e))
}

/// Walk the README filename candidates in order. `fetch` resolves a single
/// candidate to its decoded content, or `None` when that file is absent.
async fn first_readme<F, Fut>(fetch: F) -> Result<Option<(&'static str, String)>>
where
    F: Fn(&'static str) -> Fut,
    Fut: std::future::Future<Output = Result<Option<String>>>,
{
    for candidate in README_CANDIDATES.iter().copied() {
        if let Some(text) = fetch(candidate).await? {
            return Ok(Some((candidate, text)));
        }
    }
    Ok(None)
}

#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_base: String,
    token: String,
    retry: RetryPolicy,
}

impl GithubClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::InvalidInput("github token is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::backend("build http client", e))?;
        Ok(Self {
            client,
            api_base: "https://api.github.com".to_string(),
            token,
            retry: RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_secs(2),
                backoff_multiplier: 2.0,
            },
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut h = HeaderMap::new();
        h.insert(USER_AGENT, HeaderValue::from_static("stardocs"));
        h.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        let auth = format!("token {}", self.token);
        h.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| Error::backend("invalid github auth header", e))?,
        );
        Ok(h)
    }

    async fn fetch_starred_page(&self, per_page: usize, page: usize) -> Result<Vec<RepoPayload>> {
        let url = format!("{}/user/starred", self.api_base);
        let resp = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("sort", "created".to_string()),
                ("direction", "desc".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::network("list starred repositories", e))?
            .error_for_status()
            .map_err(|e| Error::network("list starred repositories", e))?;
        resp.json()
            .await
            .map_err(|e| Error::network("parse starred repositories", e))
    }

    async fn fetch_readme_candidate(
        &self,
        full_name: &str,
        candidate: &str,
    ) -> Result<Option<String>> {
        let url = format!(
            "{}/repos/{}/contents/{}",
            self.api_base, full_name, candidate
        );
        let resp = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| Error::network("fetch readme", e))?;

        match resp.status() {
            StatusCode::OK => {
                let payload: ContentsPayload = resp
                    .json()
                    .await
                    .map_err(|e| Error::network("parse readme payload", e))?;
                Ok(Some(decode_contents(&payload.content)?))
            }
            StatusCode::NOT_FOUND => Ok(None),
            other => {
                tracing::debug!(repo = %full_name, file = candidate, status = %other, "unexpected readme status; trying next candidate");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl RepoSource for GithubClient {
    #[instrument(level = "debug", skip(self))]
    async fn get_recent(&self, limit: usize) -> Result<Vec<StarredRepo>> {
        let payloads = retry_with_policy(
            &self.retry,
            "github recent stars",
            Error::is_transient,
            || self.fetch_starred_page(limit, 1),
        )
        .await?;
        payloads.into_iter().map(RepoPayload::into_repo).collect()
    }

    /// Paginate the full history, 100 per page, until a short page. A
    /// failing page is logged and pagination stops with the partial result.
    #[instrument(level = "info", skip(self))]
    async fn get_all(&self) -> Result<Vec<StarredRepo>> {
        let mut repos = Vec::new();
        let mut page = 1usize;
        loop {
            tracing::debug!(page, "fetching starred page");
            match self.fetch_starred_page(PAGE_SIZE, page).await {
                Ok(batch) => {
                    let short = batch.len() < PAGE_SIZE;
                    for payload in batch {
                        repos.push(payload.into_repo()?);
                    }
                    if short {
                        break;
                    }
                    page += 1;
                }
                Err(e) => {
                    tracing::error!(page, error = %e, "failed to fetch starred page; stopping pagination");
                    break;
                }
            }
        }
        Ok(repos)
    }

    #[instrument(level = "debug", skip(self))]
    async fn resolve(&self, full_name: &str) -> Result<StarredRepo> {
        let url = format!("{}/repos/{}", self.api_base, full_name);
        let payload: RepoPayload = retry_with_policy(
            &self.retry,
            "github resolve repository",
            Error::is_transient,
            || async {
                self.client
                    .get(&url)
                    .headers(self.headers()?)
                    .send()
                    .await
                    .map_err(|e| Error::network("resolve repository", e))?
                    .error_for_status()
                    .map_err(|e| Error::network("resolve repository", e))?
                    .json()
                    .await
                    .map_err(|e| Error::network("parse repository", e))
            },
        )
        .await?;
        payload.into_repo()
    }
}

#[async_trait]
impl ContentProvider for GithubClient {
    /// Try the README filename candidates in order via the contents API.
    /// A 404 moves to the next candidate; exhausting them is not an error.
    #[instrument(level = "debug", skip(self))]
    async fn supplementary(&self, full_name: &str) -> Result<Option<String>> {
        retry_with_policy(&self.retry, "github readme", Error::is_transient, || async {
            let found =
                first_readme(|candidate| self.fetch_readme_candidate(full_name, candidate)).await?;
            match found {
                Some((file, text)) => {
                    tracing::info!(repo = %full_name, file, "readme retrieved");
                    Ok(Some(text))
                }
                None => {
                    tracing::info!(repo = %full_name, "no readme found");
                    Ok(None)
                }
            }
        })
        .await
    }
}
