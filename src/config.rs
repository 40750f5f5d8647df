//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every option carries a default, so a minimal file only needs the
//! weapon filter and the profit targets. The API key is referenced by
//! env-var name and resolved at startup.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub scanner: ScannerConfig,
    pub pricing: PricingConfig,
    pub filters: FilterConfig,
    /// Dynamic profit targets, evaluated in order. First match wins.
    pub profit_targets: Vec<ProfitTier>,
    pub strategies: StrategiesConfig,
    pub storage: StorageConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// Name of the env var holding the CSFloat API key.
    pub api_key_env: String,
    pub listings_url: String,
    pub price_lookup_url: String,
    /// Deal links are `{item_url_base}/{listing id}`.
    pub item_url_base: String,
    pub user_agent: String,
    pub feed_timeout_secs: u64,
    pub price_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "CSFLOAT_API_KEY".to_string(),
            listings_url: "https://csfloat.com/api/v1/listings".to_string(),
            price_lookup_url: "https://csprices.com/api/v1/prices".to_string(),
            item_url_base: "https://csfloat.com/item".to_string(),
            user_agent: "SKINSCOUT/0.1.0 (listing-scanner)".to_string(),
            feed_timeout_secs: 30,
            price_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    pub scan_interval_secs: u64,
    /// Maximum pages requested per cycle.
    pub scan_pages: u32,
    pub page_size: u32,
    /// Price window in dollars.
    pub min_price: Decimal,
    pub max_price: Decimal,
    /// Pause between successful page fetches.
    pub page_delay_ms: u64,
    /// Wait after an HTTP 429 before retrying the same page.
    pub rate_limit_backoff_secs: u64,
    /// Consecutive 429s tolerated in one cycle before giving up.
    pub max_rate_limit_retries: u32,
    /// Cap on remembered listing ids; 0 keeps every id for the process lifetime.
    pub seen_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 600,
            scan_pages: 10,
            page_size: 50,
            min_price: dec!(0.50),
            max_price: dec!(200.00),
            page_delay_ms: 2500,
            rate_limit_backoff_secs: 60,
            max_rate_limit_retries: 5,
            seen_capacity: 0,
        }
    }
}

impl ScannerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PricingConfig {
    pub cache_ttl_secs: u64,
    /// Pause after every successful external lookup.
    pub lookup_cooldown_ms: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            lookup_cooldown_ms: 2500,
        }
    }
}

impl PricingConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn lookup_cooldown(&self) -> Duration {
        Duration::from_millis(self.lookup_cooldown_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Substrings of market names to consider ("AK-47", "AWP", ...).
    pub included_weapons: Vec<String>,
}

/// One bracket of the dynamic profit targets.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProfitTier {
    /// Inclusive upper bound on the base price this tier covers.
    pub max_skin_price: Decimal,
    pub min_profit_usd: Decimal,
    pub min_profit_percentage: Decimal,
}

/// Sticker retention bracket: share of sticker value recovered on resale.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RetentionTier {
    pub max_skin_price: Decimal,
    /// Percentage, e.g. `20.0` for 20%.
    pub retention: Decimal,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StrategiesConfig {
    pub sticker: StickerConfig,
    pub charm: CharmConfig,
    pub price_anomaly: PriceAnomalyConfig,
    pub high_overpay: HighOverpayConfig,
    pub low_float: LowFloatConfig,
    pub float_tier_upgrade: FloatTierUpgradeConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StickerConfig {
    pub conservative_enabled: bool,
    pub aggressive_enabled: bool,
    pub conservative: Vec<RetentionTier>,
    pub aggressive: Vec<RetentionTier>,
}

impl Default for StickerConfig {
    fn default() -> Self {
        Self {
            conservative_enabled: true,
            aggressive_enabled: true,
            conservative: Vec::new(),
            aggressive: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CharmConfig {
    pub enabled: bool,
    pub sale_fee_percentage: Decimal,
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sale_fee_percentage: dec!(7.0),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PriceAnomalyConfig {
    pub enabled: bool,
    pub min_discount_percentage: Decimal,
}

impl Default for PriceAnomalyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_discount_percentage: dec!(8.0),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HighOverpayConfig {
    pub enabled: bool,
    pub max_price_above_base_percentage: Decimal,
    pub min_sticker_value: Decimal,
}

impl Default for HighOverpayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_price_above_base_percentage: dec!(5.0),
            min_sticker_value: dec!(50.0),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LowFloatConfig {
    pub enabled: bool,
    pub min_price_gap_usd: Decimal,
    /// Only floats in the best N% of their tier's range qualify.
    pub top_percentile_threshold: f64,
    pub premium_retention_percentage: Decimal,
}

impl Default for LowFloatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_price_gap_usd: dec!(10.0),
            top_percentile_threshold: 10.0,
            premium_retention_percentage: dec!(30.0),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FloatTierUpgradeConfig {
    pub enabled: bool,
    pub max_float_premium_percentage: Decimal,
    /// Absolute float distance above the tier minimum that still qualifies.
    pub float_proximity_threshold: f64,
}

impl Default for FloatTierUpgradeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_float_premium_percentage: dec!(3.0),
            float_proximity_threshold: 0.008,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://deals.db".to_string(),
            max_connections: 4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5000,
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: AppConfig =
            toml::from_str(contents).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants and normalise tables. Retention tables are sorted
    /// by ascending `max_skin_price`; profit targets keep their order.
    pub fn validate(&mut self) -> Result<()> {
        let s = &self.scanner;
        if s.scan_pages == 0 {
            bail!("scanner.scan_pages must be at least 1");
        }
        if s.page_size == 0 {
            bail!("scanner.page_size must be at least 1");
        }
        if s.min_price < Decimal::ZERO || s.max_price < s.min_price {
            bail!(
                "scanner price window is invalid: min_price={} max_price={}",
                s.min_price,
                s.max_price
            );
        }

        for tier in &self.profit_targets {
            if tier.max_skin_price <= Decimal::ZERO {
                bail!("profit_targets: max_skin_price must be positive");
            }
        }

        let stickers = &mut self.strategies.sticker;
        for table in [&mut stickers.conservative, &mut stickers.aggressive] {
            if table.iter().any(|t| t.retention < Decimal::ZERO || t.retention > dec!(100)) {
                bail!("strategies.sticker: retention must be within 0..=100");
            }
            table.sort_by(|a, b| a.max_skin_price.cmp(&b.max_skin_price));
        }

        let fee = self.strategies.charm.sale_fee_percentage;
        if fee < Decimal::ZERO || fee > dec!(100) {
            bail!("strategies.charm.sale_fee_percentage must be within 0..=100");
        }

        let low = &self.strategies.low_float;
        if !(0.0..=100.0).contains(&low.top_percentile_threshold) {
            bail!("strategies.low_float.top_percentile_threshold must be within 0..=100");
        }

        if self.strategies.float_tier_upgrade.float_proximity_threshold < 0.0 {
            bail!("strategies.float_tier_upgrade.float_proximity_threshold must not be negative");
        }

        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Used for the API key referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
