//! Latest release lookup against the source hosting tags API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Error type for a single release lookup.
///
/// None of these are fatal: the cache keeps serving the last known version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("release API responded with HTTP {0}")]
    BadStatus(u16),

    #[error("release API unreachable: {0}")]
    Unreachable(String),

    #[error("malformed release API response: {0}")]
    MalformedResponse(String),
}

/// Source of the latest released version.
#[async_trait]
pub trait VersionFetcher: Send + Sync {
    /// Perform one lookup and return the latest version without its `v` prefix.
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// Fetches the newest tag from a GitHub-style `GET /repos/{owner}/{repo}/tags` listing.
#[derive(Clone, Debug)]
pub struct GithubTagsFetcher {
    client: Client,
    url: String,
}

impl GithubTagsFetcher {
    /// Build a fetcher with its own HTTP client.
    ///
    /// `timeout` bounds the whole request, body included.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// The tags listing URL this fetcher queries.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VersionFetcher for GithubTagsFetcher {
    async fn fetch(&self) -> Result<String, FetchError> {
        debug!("Fetching latest release tag from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        // A timeout while streaming the body is still a network failure
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        parse_latest_tag(&body)
    }
}

/// Extract the version from the first entry of a tags listing.
pub fn parse_latest_tag(body: &[u8]) -> Result<String, FetchError> {
    let tags: Vec<Value> = serde_json::from_slice(body)
        .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    let first = tags
        .first()
        .ok_or_else(|| FetchError::MalformedResponse("empty tag list".to_string()))?;

    let name = first
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| FetchError::MalformedResponse("first tag has no name".to_string()))?;

    let version = strip_version_prefix(name);
    if version.is_empty() {
        return Err(FetchError::MalformedResponse(format!(
            "tag name {:?} carries no version",
            name
        )));
    }

    Ok(version.to_string())
}

/// Remove a single leading `v` from a tag name.
pub fn strip_version_prefix(name: &str) -> &str {
    name.strip_prefix('v').unwrap_or(name)
}
