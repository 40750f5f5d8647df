//! External reference prices with a time-bounded cache.
//!
//! Strategies that compare wear tiers need the market price of a skin
//! variant the feed did not return. `PriceCache` memoises those lookups
//! for an hour and paces outbound requests with a cooldown after every
//! successful call.

pub mod csprices;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::PricingConfig;

/// Why a price lookup produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum PriceLookupError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("lookup reported no success")]
    Unsuccessful,
}

/// Abstraction over a single-item price API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current market price in dollars for an exact market name.
    async fn lookup(&self, market_hash_name: &str) -> Result<Decimal, PriceLookupError>;
}

#[derive(Debug, Clone, Copy)]
pub struct CachedPrice {
    pub price: Decimal,
    pub fetched_at: Instant,
}

/// Memo of external prices keyed by market name.
pub struct PriceCache {
    source: Box<dyn PriceSource>,
    entries: HashMap<String, CachedPrice>,
    ttl: Duration,
    cooldown: Duration,
    hits: u64,
    lookups: u64,
}

impl PriceCache {
    pub fn new(source: Box<dyn PriceSource>, config: &PricingConfig) -> Self {
        Self {
            source,
            entries: HashMap::new(),
            ttl: config.cache_ttl(),
            cooldown: config.lookup_cooldown(),
            hits: 0,
            lookups: 0,
        }
    }

    /// Cached price if still fresh, otherwise an external lookup.
    ///
    /// Returns zero when the lookup fails; failures are not cached and do
    /// not incur the cooldown.
    pub async fn get_price(&mut self, market_hash_name: &str) -> Decimal {
        if let Some(entry) = self.entries.get(market_hash_name) {
            if entry.fetched_at.elapsed() < self.ttl {
                self.hits += 1;
                return entry.price;
            }
        }

        self.lookups += 1;
        match self.source.lookup(market_hash_name).await {
            Ok(price) => {
                debug!(name = market_hash_name, %price, "Fetched reference price");
                self.entries.insert(
                    market_hash_name.to_string(),
                    CachedPrice {
                        price,
                        fetched_at: Instant::now(),
                    },
                );
                tokio::time::sleep(self.cooldown).await;
                price
            }
            Err(e) => {
                warn!(name = market_hash_name, error = %e, "Could not fetch price");
                Decimal::ZERO
            }
        }
    }

    /// Drop entries past their TTL.
    pub fn evict_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (cache hits, external lookups) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.lookups)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
