//! CSFloat marketplace listing search.
//!
//! API: `GET /api/v1/listings` with the raw API key in `Authorization`.
//! Returns `{ "data": [listing, ...], "cursor": "..." }`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

use super::{FeedError, FeedPage, FeedTransport, PageRequest};
use crate::config::ApiConfig;

/// HTTP transport for the CSFloat listing feed.
pub struct CsfloatTransport {
    http: Client,
    listings_url: String,
    api_key: SecretString,
}

impl CsfloatTransport {
    pub fn new(
        listings_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client for CSFloat")?;

        Ok(Self {
            http,
            listings_url: listings_url.into(),
            api_key,
        })
    }

    pub fn from_config(config: &ApiConfig, api_key: SecretString) -> Result<Self> {
        Self::new(
            config.listings_url.clone(),
            api_key,
            Duration::from_secs(config.feed_timeout_secs),
            &config.user_agent,
        )
    }
}

#[async_trait]
impl FeedTransport for CsfloatTransport {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FeedPage, FeedError> {
        debug!(cursor = ?request.cursor, "Fetching CSFloat listings page");

        let resp = self
            .http
            .get(&self.listings_url)
            .query(&request.query_pairs())
            .header(header::AUTHORIZATION, self.api_key.expose_secret().as_str())
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        match resp.status() {
            status if status.is_success() => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(FeedError::RateLimited),
            StatusCode::FORBIDDEN => return Err(FeedError::Forbidden),
            status => {
                let body = resp.text().await.unwrap_or_default();
                return Err(FeedError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| FeedError::MalformedEnvelope(format!("invalid JSON: {e}")))?;

        FeedPage::from_json(body)
    }
}
