//! Listing feed ingestion.
//!
//! Defines the `FeedTransport` trait (one page request against the
//! marketplace) and `FeedClient`, which paginates through the newest
//! buy-now listings, honours rate limits, and drops listings it has
//! already seen in this process.

pub mod csfloat;

use async_trait::async_trait;
use rust_decimal::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ScannerConfig;
use crate::types::Listing;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a single page request failed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("forbidden (HTTP 403): the API key is likely invalid")]
    Forbidden,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response format: {0}")]
    MalformedEnvelope(String),
}

// ---------------------------------------------------------------------------
// Page request / response
// ---------------------------------------------------------------------------

/// Query parameters for one page of the listing search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub sort_by: String,
    pub listing_type: String,
    pub limit: u32,
    pub min_price_cents: u64,
    pub max_price_cents: u64,
    pub cursor: Option<String>,
}

impl PageRequest {
    /// First-page request built from the scanner settings.
    pub fn first(config: &ScannerConfig) -> Self {
        Self {
            sort_by: "most_recent".to_string(),
            listing_type: "buy_now".to_string(),
            limit: config.page_size,
            min_price_cents: usd_to_cents(config.min_price),
            max_price_cents: usd_to_cents(config.max_price),
            cursor: None,
        }
    }

    pub fn with_cursor(&self, cursor: String) -> Self {
        Self {
            cursor: Some(cursor),
            ..self.clone()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("sort_by", self.sort_by.clone()),
            ("type", self.listing_type.clone()),
            ("limit", self.limit.to_string()),
            ("min_price", self.min_price_cents.to_string()),
            ("max_price", self.max_price_cents.to_string()),
        ];
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        pairs
    }
}

/// Dollars to whole cents, truncating fractions of a cent.
fn usd_to_cents(usd: Decimal) -> u64 {
    (usd * Decimal::ONE_HUNDRED).trunc().to_u64().unwrap_or(0)
}

/// One decoded page of listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    pub listings: Vec<Listing>,
    /// Continuation cursor; `None` marks the end of the feed.
    pub cursor: Option<String>,
    /// Entries on the page that could not be decoded.
    pub skipped: usize,
}

impl FeedPage {
    /// Decode the `{data: [...], cursor}` envelope. Entries are decoded
    /// one by one so a single malformed listing is skipped, not fatal.
    pub fn from_json(value: serde_json::Value) -> Result<Self, FeedError> {
        let serde_json::Value::Object(mut envelope) = value else {
            return Err(FeedError::MalformedEnvelope("body is not an object".into()));
        };

        let entries = match envelope.remove("data") {
            Some(serde_json::Value::Array(entries)) => entries,
            Some(_) => return Err(FeedError::MalformedEnvelope("`data` is not an array".into())),
            None => return Err(FeedError::MalformedEnvelope("missing `data`".into())),
        };

        let cursor = envelope
            .get("cursor")
            .and_then(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .map(String::from);

        let mut listings = Vec::with_capacity(entries.len());
        let mut skipped = 0;
        for entry in entries {
            match serde_json::from_value::<Listing>(entry) {
                Ok(listing) => listings.push(listing),
                Err(e) => {
                    debug!(error = %e, "Skipping undecodable listing");
                    skipped += 1;
                }
            }
        }

        Ok(Self {
            listings,
            cursor,
            skipped,
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Abstraction over the upstream listing search.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Fetch one page. Status codes are mapped onto `FeedError` variants.
    async fn fetch_page(&self, request: &PageRequest) -> Result<FeedPage, FeedError>;
}

// ---------------------------------------------------------------------------
// Seen set
// ---------------------------------------------------------------------------

/// Listing ids already handed to the strategies.
///
/// Unbounded by default. With a capacity, the oldest ids are forgotten
/// first once the cap is reached.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenSet {
    /// `capacity == 0` means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: String) -> bool {
        if !self.ids.insert(id.clone()) {
            return false;
        }
        if self.capacity > 0 {
            self.order.push_back(id);
            while self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.ids.remove(&oldest);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Feed client
// ---------------------------------------------------------------------------

/// Paginating, de-duplicating listing fetcher.
pub struct FeedClient {
    transport: Box<dyn FeedTransport>,
    first_page: PageRequest,
    max_pages: u32,
    page_delay: Duration,
    rate_limit_backoff: Duration,
    max_rate_limit_retries: u32,
    seen: SeenSet,
}

impl FeedClient {
    pub fn new(transport: Box<dyn FeedTransport>, config: &ScannerConfig) -> Self {
        Self {
            transport,
            first_page: PageRequest::first(config),
            max_pages: config.scan_pages,
            page_delay: config.page_delay(),
            rate_limit_backoff: config.rate_limit_backoff(),
            max_rate_limit_retries: config.max_rate_limit_retries,
            seen: SeenSet::new(config.seen_capacity),
        }
    }

    /// Fetch up to `max_pages` pages of listings not seen before.
    ///
    /// Never fails: any error ends pagination for this cycle and the
    /// listings gathered so far are returned. The seen set is left
    /// untouched; call `mark_seen` once the batch has been processed.
    pub async fn fetch_new_listings(&mut self) -> Vec<Listing> {
        let mut collected: Vec<Listing> = Vec::new();
        let mut batch_ids: HashSet<String> = HashSet::new();
        let mut request = self.first_page.clone();
        let mut pages_done = 0u32;
        let mut rate_limit_hits = 0u32;
        let mut dropped = 0usize;

        while pages_done < self.max_pages {
            let page_no = pages_done + 1;

            let page = match self.transport.fetch_page(&request).await {
                Ok(page) => page,
                Err(FeedError::RateLimited) => {
                    rate_limit_hits += 1;
                    if rate_limit_hits > self.max_rate_limit_retries {
                        error!(page = page_no, retries = rate_limit_hits - 1, "Still rate limited, stopping fetch for this cycle");
                        break;
                    }
                    warn!(
                        page = page_no,
                        wait_secs = self.rate_limit_backoff.as_secs(),
                        "Rate limited by API, waiting before retrying the same page"
                    );
                    tokio::time::sleep(self.rate_limit_backoff).await;
                    continue;
                }
                Err(FeedError::Forbidden) => {
                    error!(page = page_no, "HTTP 403 Forbidden. Check the API key in your environment");
                    break;
                }
                Err(e @ FeedError::MalformedEnvelope(_)) => {
                    warn!(page = page_no, error = %e, "Unexpected response format, ending fetch for this cycle");
                    break;
                }
                Err(e) => {
                    error!(page = page_no, error = %e, "Page fetch failed, stopping fetch for this cycle");
                    break;
                }
            };

            pages_done += 1;
            rate_limit_hits = 0;

            let on_page = page.listings.len();
            for listing in page.listings {
                if self.seen.contains(&listing.id) || !batch_ids.insert(listing.id.clone()) {
                    dropped += 1;
                    continue;
                }
                collected.push(listing);
            }

            debug!(
                page = page_no,
                on_page,
                undecodable = page.skipped,
                total = collected.len(),
                "Feed page fetched"
            );

            match page.cursor {
                Some(cursor) => request = request.with_cursor(cursor),
                None => {
                    info!(page = page_no, "Reached the end of listings for this request");
                    break;
                }
            }

            if pages_done < self.max_pages {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        info!(
            pages = pages_done,
            new = collected.len(),
            already_seen = dropped,
            "Feed fetch complete"
        );

        collected
    }

    /// Record listing ids as processed.
    pub fn mark_seen<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.seen.insert(id.to_string());
        }
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
