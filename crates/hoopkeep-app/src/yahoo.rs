// Yahoo Fantasy API client.
//
// Issues authenticated GETs against resource paths relative to the configured
// API base and hands the decoded JSON to the normalizer. A 401 carrying
// `expired_token` triggers one token refresh and one retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const EXPIRED_TOKEN_MARKER: &str = "expired_token";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request for {path} failed: {source}")]
    Transport {
        path: String,
        source: reqwest::Error,
    },

    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("{path} returned a body that is not JSON: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },

    #[error("no access token configured (set access_token in credentials.toml or HOOPKEEP_ACCESS_TOKEN)")]
    MissingCredential,

    #[error("access token expired and cannot be refreshed")]
    ExpiredCredential,
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Source of bearer tokens for the Yahoo client.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The token to send on the next request.
    async fn access_token(&self) -> Result<String, FetchError>;

    /// Obtain a replacement after the current token was rejected as expired.
    async fn refresh(&self) -> Result<String, FetchError>;
}

/// Anything that can turn a Yahoo resource path into a JSON payload.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Value, FetchError>;
}

// ---------------------------------------------------------------------------
// Token providers
// ---------------------------------------------------------------------------

/// A fixed token. Refreshing is not possible.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, FetchError> {
        if self.0.trim().is_empty() {
            return Err(FetchError::MissingCredential);
        }
        Ok(self.0.clone())
    }

    async fn refresh(&self) -> Result<String, FetchError> {
        Err(FetchError::ExpiredCredential)
    }
}

// ---------------------------------------------------------------------------
// YahooClient
// ---------------------------------------------------------------------------

pub struct YahooClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl YahooClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        YahooClient {
            http,
            base_url: base_url.into(),
            tokens,
        }
    }

    /// Build a client from the application config, using the configured
    /// access token as is.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.yahoo.timeout_secs))
            .build()
            .map_err(FetchError::Client)?;
        let token = config.credentials.access_token.clone().unwrap_or_default();
        Ok(YahooClient::new(
            http,
            config.yahoo.api_base.clone(),
            Arc::new(StaticToken(token)),
        ))
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get(&self, path: &str, token: &str) -> Result<(u16, String), FetchError> {
        let resp = self
            .http
            .get(self.url_for(path))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("format", "json")])
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                path: path.to_string(),
                source,
            })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|source| FetchError::Transport {
            path: path.to_string(),
            source,
        })?;
        Ok((status, body))
    }
}

fn is_expired_token(status: u16, body: &str) -> bool {
    status == 401 && body.contains(EXPIRED_TOKEN_MARKER)
}

#[async_trait]
impl ResourceFetcher for YahooClient {
    async fn fetch(&self, path: &str) -> Result<Value, FetchError> {
        let token = self.tokens.access_token().await?;
        debug!(path, "GET");
        let (mut status, mut body) = self.get(path, &token).await?;

        if is_expired_token(status, &body) {
            warn!(path, "access token expired, refreshing");
            let fresh = self.tokens.refresh().await?;
            (status, body) = self.get(path, &fresh).await?;
        }

        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                path: path.to_string(),
                status,
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
