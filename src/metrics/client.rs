//! HTTP access to the aggregation backend.

use crate::config::PeekConfig;
use crate::error::ApiError;
use crate::types::TokenAddress;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Header carrying the optional API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Backend endpoints consumed by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    TokenDetails,
    Socials,
    Security,
    DexPaid,
    Trending,
}

impl Endpoint {
    /// Path relative to the configured base URL.
    pub fn path(&self, mint: Option<&TokenAddress>) -> String {
        let mint = mint.map(TokenAddress::as_str).unwrap_or_default();
        match self {
            Endpoint::TokenDetails => format!("token/{}/dev", mint),
            Endpoint::Socials => format!("tokenSocials/{}/dev", mint),
            Endpoint::Security => format!("tokenSecurity/{}/dev", mint),
            Endpoint::DexPaid => format!("tokenDexPaid/{}/dev", mint),
            Endpoint::Trending => "trendingToken/dev".to_string(),
        }
    }
}

/// Seam between the fetcher and the network.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// GET `path` and decode the body as JSON. Non-2xx statuses are errors.
    async fn get_json(&self, path: &str) -> Result<Value, ApiError>;
}

/// reqwest-backed `MetricsApi`.
pub struct BackendClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BackendClient {
    pub fn new(config: &PeekConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MetricsApi for BackendClient {
    #[instrument(skip(self))]
    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.http_client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("{} -> HTTP {}", path, status);
            return Err(ApiError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}
