//! Scripted feed and price source for integration testing.
//!
//! Deterministic `FeedTransport` and `PriceSource` implementations that
//! replay canned responses and record every request, all in-memory with
//! no network access.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use skinscout::feed::{FeedError, FeedPage, FeedTransport, PageRequest};
use skinscout::pricing::{PriceLookupError, PriceSource};

/// A feed that answers each request with the next scripted response.
///
/// When the script runs out, every further request gets an empty page
/// with no cursor.
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    responses: Arc<Mutex<VecDeque<Result<FeedPage, FeedError>>>>,
    requests: Arc<Mutex<Vec<PageRequest>>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page decoded from a raw `{data, cursor}` envelope.
    pub fn push_envelope(&self, envelope: Value) {
        let page = FeedPage::from_json(envelope).expect("scripted envelope must decode");
        self.responses.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_error(&self, error: FeedError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedTransport for ScriptedFeed {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FeedPage, FeedError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FeedPage::default()))
    }
}

/// Fixed price table; unknown names fail the lookup.
#[derive(Clone, Default)]
pub struct FixedPrices {
    prices: Arc<HashMap<String, Decimal>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FixedPrices {
    pub fn new(prices: &[(&str, Decimal)]) -> Self {
        Self {
            prices: Arc::new(
                prices
                    .iter()
                    .map(|(name, price)| (name.to_string(), *price))
                    .collect(),
            ),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for FixedPrices {
    async fn lookup(&self, market_hash_name: &str) -> Result<Decimal, PriceLookupError> {
        self.calls.lock().unwrap().push(market_hash_name.to_string());
        self.prices
            .get(market_hash_name)
            .copied()
            .ok_or(PriceLookupError::Unsuccessful)
    }
}

// ---------------------------------------------------------------------------
// Listing builders (raw feed JSON)
// ---------------------------------------------------------------------------

/// A feed entry as CSFloat returns it, prices in cents.
pub fn listing_json(id: &str, name: &str, price: u64, base: u64) -> Value {
    json!({
        "id": id,
        "price": price,
        "type": "buy_now",
        "item": {
            "market_hash_name": name,
            "icon_url": format!("icon/{id}"),
            "is_souvenir": false,
        },
        "reference": { "base_price": base, "predicted_price": base },
    })
}

pub fn with_stickers(mut listing: Value, cents: &[u64]) -> Value {
    let stickers: Vec<Value> = cents
        .iter()
        .enumerate()
        .map(|(i, c)| json!({ "name": format!("Sticker {i}"), "scm": { "price": c } }))
        .collect();
    listing["item"]["stickers"] = Value::Array(stickers);
    listing
}

pub fn with_wear(mut listing: Value, wear: &str, float: f64) -> Value {
    listing["item"]["wear_name"] = json!(wear);
    listing["item"]["float_value"] = json!(float);
    listing
}

pub fn envelope(listings: Vec<Value>, cursor: Option<&str>) -> Value {
    match cursor {
        Some(c) => json!({ "data": listings, "cursor": c }),
        None => json!({ "data": listings }),
    }
}
