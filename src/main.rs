//! SKINSCOUT: CSFloat marketplace deal scanner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the deal store, starts the dashboard, and runs the scan loop
//! until Ctrl+C.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

use skinscout::config::AppConfig;
use skinscout::dashboard::{self, DashboardState};
use skinscout::engine::Scanner;
use skinscout::feed::csfloat::CsfloatTransport;
use skinscout::feed::FeedClient;
use skinscout::pricing::csprices::CspricesSource;
use skinscout::pricing::PriceCache;
use skinscout::storage::{DealStore, SqliteDealStore};
use skinscout::strategy::StrategyEngine;

const BANNER: &str = r#"
 ____  _  _____ _   _ ____   ____ ___  _   _ _____
/ ___|| |/ /_ _| \ | / ___| / ___/ _ \| | | |_   _|
\___ \| ' / | ||  \| \___ \| |  | | | | | | | | |
 ___) | . \ | || |\  |___) | |__| |_| | |_| | | |
|____/|_|\_\___|_| \_|____/ \____\___/ \___/  |_|

  CSFloat sticker, charm and float deal scanner
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("SKINSCOUT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path,
        scan_interval_secs = cfg.scanner.scan_interval_secs,
        scan_pages = cfg.scanner.scan_pages,
        min_price = %cfg.scanner.min_price,
        max_price = %cfg.scanner.max_price,
        weapons = cfg.filters.included_weapons.len(),
        "SKINSCOUT starting up"
    );

    let api_key = AppConfig::resolve_env(&cfg.api.api_key_env)
        .context("CSFloat API key is required")?;
    let api_key = SecretString::new(api_key);

    // -- Deal store and dashboard ----------------------------------------

    let store: Arc<dyn DealStore> = Arc::new(
        SqliteDealStore::connect(&cfg.storage.database_url, cfg.storage.max_connections).await?,
    );

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(store.clone()));
        dashboard::spawn_dashboard(state, cfg.dashboard.port).await?;
    }

    // -- Scanner ---------------------------------------------------------

    let transport = CsfloatTransport::from_config(&cfg.api, api_key)?;
    let feed = FeedClient::new(Box::new(transport), &cfg.scanner);
    let prices = PriceCache::new(
        Box::new(CspricesSource::from_config(&cfg.api)?),
        &cfg.pricing,
    );
    let engine = StrategyEngine::from_config(&cfg);
    let scanner = Scanner::new(feed, prices, engine, store, cfg.scanner.scan_interval());

    info!("Entering scan loop. Press Ctrl+C to stop.");
    tokio::select! {
        _ = scanner.run_forever() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    info!("SKINSCOUT shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("skinscout=info"));

    if std::env::var("SKINSCOUT_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
