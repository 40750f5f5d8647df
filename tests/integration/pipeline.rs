//! End-to-end scan cycles: scripted feed → strategies → SQLite store.

use rust_decimal_macros::dec;
use std::sync::Arc;

use skinscout::config::AppConfig;
use skinscout::engine::Scanner;
use skinscout::feed::{FeedClient, FeedError};
use skinscout::pricing::PriceCache;
use skinscout::storage::{DealStore, SqliteDealStore};
use skinscout::strategy::StrategyEngine;

use crate::mock_feed::*;

const CONFIG: &str = r#"
    [scanner]
    scan_pages = 3
    page_delay_ms = 0
    rate_limit_backoff_secs = 0

    [pricing]
    lookup_cooldown_ms = 0

    [filters]
    included_weapons = ["AK-47", "AWP"]

    [[profit_targets]]
    max_skin_price = 50.0
    min_profit_usd = 5.0
    min_profit_percentage = 15.0

    [[profit_targets]]
    max_skin_price = 200.0
    min_profit_usd = 12.0
    min_profit_percentage = 10.0

    [[strategies.sticker.conservative]]
    max_skin_price = 100.0
    retention = 20.0

    [[strategies.sticker.aggressive]]
    max_skin_price = 100.0
    retention = 35.0
"#;

struct Harness {
    scanner: Scanner,
    feed: ScriptedFeed,
    prices: FixedPrices,
    store: Arc<SqliteDealStore>,
}

async fn harness() -> Harness {
    let cfg = AppConfig::from_toml_str(CONFIG).unwrap();
    let feed = ScriptedFeed::new();
    let prices = FixedPrices::new(&[("AK-47 | Slate (Minimal Wear)", dec!(40))]);
    let store = Arc::new(SqliteDealStore::in_memory().await.unwrap());

    let scanner = Scanner::new(
        FeedClient::new(Box::new(feed.clone()), &cfg.scanner),
        PriceCache::new(Box::new(prices.clone()), &cfg.pricing),
        StrategyEngine::from_config(&cfg),
        store.clone(),
        cfg.scanner.scan_interval(),
    );

    Harness {
        scanner,
        feed,
        prices,
        store,
    }
}

fn mixed_page() -> serde_json::Value {
    envelope(
        vec![
            // Stickers $50 on a $100 skin listed at $95: both sticker variants
            // and high overpay fire on the same listing.
            with_stickers(
                listing_json("L1", "AK-47 | Redline (Field-Tested)", 9500, 10000),
                &[3000, 2000],
            ),
            // 20% under base
            listing_json("L2", "AWP | Asiimov (Field-Tested)", 4000, 5000),
            // Low float Field-Tested with a $20 gap to Minimal Wear
            with_wear(
                listing_json("L3", "AK-47 | Slate (Field-Tested)", 2100, 2000),
                "Field-Tested",
                0.16,
            ),
            // Filtered out: not an included weapon
            listing_json("L4", "Karambit | Fade (Factory New)", 100, 100000),
        ],
        None,
    )
}

#[tokio::test]
async fn test_cycle_persists_one_deal_per_listing() {
    let mut h = harness().await;
    h.feed.push_envelope(mixed_page());

    let report = h.scanner.run_cycle().await.unwrap();
    assert_eq!(report.listings_fetched, 4);
    assert_eq!(report.deals_found, 5);
    assert_eq!(report.deals_stored, 3);

    let stored = h.store.list_deals().await.unwrap();
    let mut ids: Vec<&str> = stored.iter().map(|d| d.deal.listing_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["L1", "L2", "L3"]);

    // L1 is first evaluated by the conservative sticker strategy.
    let l1 = stored.iter().find(|d| d.deal.listing_id == "L1").unwrap();
    assert_eq!(l1.deal.strategy, "Conservative");
    assert_eq!(l1.deal.profit, dec!(15));
    assert_eq!(l1.deal.url, "https://csfloat.com/item/L1");

    let l3 = stored.iter().find(|d| d.deal.listing_id == "L3").unwrap();
    assert_eq!(l3.deal.strategy, "Low Float");
    assert_eq!(l3.deal.profit, dec!(5));
    assert_eq!(h.prices.calls(), vec!["AK-47 | Slate (Minimal Wear)".to_string()]);
}

#[tokio::test]
async fn test_seen_listings_not_reevaluated() {
    let mut h = harness().await;
    h.feed.push_envelope(mixed_page());
    h.scanner.run_cycle().await.unwrap();

    // Same listings plus one fresh one.
    let mut page = mixed_page();
    page["data"]
        .as_array_mut()
        .unwrap()
        .push(listing_json("L5", "AK-47 | Redline (Field-Tested)", 5000, 5000));
    h.feed.push_envelope(page);

    let report = h.scanner.run_cycle().await.unwrap();
    assert_eq!(report.listings_fetched, 1);
    assert_eq!(report.deals_found, 0);
    assert_eq!(h.store.list_deals().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_pagination_follows_cursor_until_exhausted() {
    let mut h = harness().await;
    h.feed.push_envelope(envelope(
        vec![listing_json("P1", "AWP | Asiimov (Field-Tested)", 4000, 5000)],
        Some("page-2"),
    ));
    h.feed.push_envelope(envelope(
        vec![listing_json("P2", "AWP | Asiimov (Field-Tested)", 4000, 5000)],
        None,
    ));

    let report = h.scanner.run_cycle().await.unwrap();
    assert_eq!(report.listings_fetched, 2);
    assert_eq!(report.deals_stored, 2);

    let requests = h.feed.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].cursor, None);
    assert_eq!(requests[1].cursor.as_deref(), Some("page-2"));
    assert_eq!(requests[0].min_price_cents, 50);
    assert_eq!(requests[0].max_price_cents, 20000);
}

#[tokio::test]
async fn test_rate_limit_retries_same_page() {
    let mut h = harness().await;
    h.feed.push_envelope(envelope(
        vec![listing_json("R1", "AWP | Asiimov (Field-Tested)", 4000, 5000)],
        Some("next"),
    ));
    h.feed.push_error(FeedError::RateLimited);
    h.feed.push_envelope(envelope(
        vec![listing_json("R2", "AWP | Asiimov (Field-Tested)", 4000, 5000)],
        None,
    ));

    let report = h.scanner.run_cycle().await.unwrap();
    assert_eq!(report.listings_fetched, 2);

    let requests = h.feed.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1], requests[2]);
}

#[tokio::test]
async fn test_forbidden_keeps_earlier_pages_and_next_cycle_recovers() {
    let mut h = harness().await;
    h.feed.push_envelope(envelope(
        vec![listing_json("F1", "AWP | Asiimov (Field-Tested)", 4000, 5000)],
        Some("next"),
    ));
    h.feed.push_error(FeedError::Forbidden);

    let report = h.scanner.run_cycle().await.unwrap();
    assert_eq!(report.listings_fetched, 1);
    assert_eq!(report.deals_stored, 1);

    h.feed.push_envelope(envelope(
        vec![listing_json("F2", "AWP | Asiimov (Field-Tested)", 4000, 5000)],
        None,
    ));
    let report = h.scanner.run_cycle().await.unwrap();
    assert_eq!(report.cycle_number, 2);
    assert_eq!(report.deals_stored, 1);
}

#[tokio::test]
async fn test_deals_survive_store_reopen_without_duplicates() {
    let path = std::env::temp_dir().join(format!("skinscout_it_{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());
    let cfg = AppConfig::from_toml_str(CONFIG).unwrap();

    for _ in 0..2 {
        // A fresh process: empty seen set, same database.
        let feed = ScriptedFeed::new();
        feed.push_envelope(mixed_page());
        let store = Arc::new(SqliteDealStore::connect(&url, 2).await.unwrap());
        let mut scanner = Scanner::new(
            FeedClient::new(Box::new(feed), &cfg.scanner),
            PriceCache::new(
                Box::new(FixedPrices::new(&[("AK-47 | Slate (Minimal Wear)", dec!(40))])),
                &cfg.pricing,
            ),
            StrategyEngine::from_config(&cfg),
            store.clone(),
            cfg.scanner.scan_interval(),
        );
        scanner.run_cycle().await.unwrap();
        assert_eq!(store.list_deals().await.unwrap().len(), 3);
    }

    let _ = std::fs::remove_file(&path);
}
