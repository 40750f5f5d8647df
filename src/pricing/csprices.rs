//! csprices.com single-item price lookup.
//!
//! API: `GET /api/v1/prices/{market_hash_name}`
//! Returns `{ "success": true, "price": "12.34" }`. The price is sometimes
//! a JSON number and sometimes a string.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use super::{PriceLookupError, PriceSource};
use crate::config::ApiConfig;

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    price: Option<serde_json::Value>,
}

/// HTTP price source backed by csprices.com.
pub struct CspricesSource {
    http: Client,
    base_url: String,
}

impl CspricesSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client for price lookups")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(
            config.price_lookup_url.clone(),
            Duration::from_secs(config.price_timeout_secs),
            &config.user_agent,
        )
    }

    fn url_for(&self, market_hash_name: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(market_hash_name))
    }
}

/// Accepts `12.34`, `"12.34"` and `1.2e1`; a missing or null price is zero.
fn parse_price(value: Option<&serde_json::Value>) -> Result<Decimal, PriceLookupError> {
    let text = match value {
        None | Some(serde_json::Value::Null) => return Ok(Decimal::ZERO),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(PriceLookupError::Malformed(format!(
                "unexpected price value: {other}"
            )))
        }
    };
    if text.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| PriceLookupError::Malformed(format!("price {text:?}: {e}")))
}

#[async_trait]
impl PriceSource for CspricesSource {
    async fn lookup(&self, market_hash_name: &str) -> Result<Decimal, PriceLookupError> {
        let resp = self
            .http
            .get(self.url_for(market_hash_name))
            .send()
            .await
            .map_err(|e| PriceLookupError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PriceLookupError::Status(status.as_u16()));
        }

        let body: PriceResponse = resp
            .json()
            .await
            .map_err(|e| PriceLookupError::Malformed(e.to_string()))?;

        if !body.success {
            return Err(PriceLookupError::Unsuccessful);
        }
        parse_price(body.price.as_ref())
    }
}
