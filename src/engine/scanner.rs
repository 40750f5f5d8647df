//! The scan loop.
//!
//! One `Scanner` owns the feed client (with its seen set) and the price
//! cache outright, so nothing here needs a lock. Each cycle fetches new
//! listings, runs the strategies, persists any deals, and commits the
//! fetched ids to the seen set whether or not persistence succeeded.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

use crate::feed::FeedClient;
use crate::pricing::PriceCache;
use crate::storage::DealStore;
use crate::strategy::StrategyEngine;

/// Summary of one scan cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub listings_fetched: usize,
    pub deals_found: usize,
    /// Deals actually added; duplicates of stored listings are not counted.
    pub deals_stored: usize,
    pub prices_evicted: usize,
    /// Price requests answered from the cache this cycle.
    pub price_hits: u64,
    /// Price requests that went to the external source this cycle.
    pub price_lookups: u64,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn log(&self) {
        info!(
            cycle = self.cycle_number,
            listings = self.listings_fetched,
            deals = self.deals_found,
            stored = self.deals_stored,
            evicted = self.prices_evicted,
            price_hits = self.price_hits,
            price_lookups = self.price_lookups,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Cycle complete"
        );
    }
}

pub struct Scanner {
    feed: FeedClient,
    prices: PriceCache,
    engine: StrategyEngine,
    store: Arc<dyn DealStore>,
    interval: Duration,
    cycle_count: u64,
}

impl Scanner {
    pub fn new(
        feed: FeedClient,
        prices: PriceCache,
        engine: StrategyEngine,
        store: Arc<dyn DealStore>,
        interval: Duration,
    ) -> Self {
        Self {
            feed,
            prices,
            engine,
            store,
            interval,
            cycle_count: 0,
        }
    }

    /// Run one fetch, evaluate, persist pass.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycle_count += 1;
        let started = Instant::now();
        info!(cycle = self.cycle_count, "Starting cycle");

        let prices_evicted = self.prices.evict_expired();
        let (hits_before, lookups_before) = self.prices.stats();
        let listings = self.feed.fetch_new_listings().await;

        let deals = if listings.is_empty() {
            Vec::new()
        } else {
            self.engine.evaluate_all(&listings, &mut self.prices).await
        };

        let (hits_after, lookups_after) = self.prices.stats();

        for deal in &deals {
            info!(url = %deal.url, "Deal found: {deal}");
        }

        let stored = if deals.is_empty() {
            Ok(0)
        } else {
            self.store.insert_deals(&deals).await
        };

        // Commit ids even when the store failed.
        self.feed.mark_seen(listings.iter().map(|l| l.id.as_str()));

        let deals_stored = stored.context("Failed to store deals")?;

        Ok(CycleReport {
            cycle_number: self.cycle_count,
            listings_fetched: listings.len(),
            deals_found: deals.len(),
            deals_stored,
            prices_evicted,
            price_hits: hits_after - hits_before,
            price_lookups: lookups_after - lookups_before,
            elapsed: started.elapsed(),
        })
    }

    /// Cycle forever. Failures are logged and followed by the usual sleep.
    pub async fn run_forever(mut self) {
        info!(
            interval_secs = self.interval.as_secs(),
            strategies = ?self.engine.strategy_names(),
            "Scanner started"
        );
        loop {
            match self.run_cycle().await {
                Ok(report) => report.log(),
                Err(e) => error!(cycle = self.cycle_count, error = %e, "Cycle failed, continuing to next"),
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn feed(&self) -> &FeedClient {
        &self.feed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
