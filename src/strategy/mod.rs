//! Strategy engine: deal detection over a batch of listings.
//!
//! Each strategy is a variant of `Strategy` and evaluates one listing at a
//! time, producing at most one `Finding`. `StrategyEngine` applies the
//! shared pre-filter, runs every enabled strategy over the batch in a fixed
//! order, and turns findings into `Deal`s.

pub mod anomaly;
pub mod charm;
pub mod float;
pub mod overpay;
pub mod profit;
pub mod sticker;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::pricing::PriceCache;
use crate::types::{Deal, Listing, WearTier};
use anomaly::PriceAnomaly;
use charm::CharmArbitrage;
use float::{FloatTierUpgrade, LowFloat};
use overpay::HighOverpay;
use profit::ProfitabilityModel;
use sticker::StickerArbitrage;

// ---------------------------------------------------------------------------
// Evaluation results
// ---------------------------------------------------------------------------

/// Per-listing failure inside a strategy. Logged and skipped by the engine.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvalError {
    #[error("unknown wear tier {0:?}")]
    UnknownWear(String),

    #[error("float {float} is outside the {tier} range")]
    FloatOutOfRange { float: f64, tier: WearTier },
}

/// What a strategy reports for an accepted listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub profit: Decimal,
    /// Always a JSON object.
    pub details: serde_json::Value,
}

/// Parse the listing's wear tier. `Ok(None)` when the feed gave no wear.
pub(crate) fn wear_tier_of(listing: &Listing) -> Result<Option<WearTier>, EvalError> {
    match listing.item.wear_name.as_deref() {
        None | Some("") => Ok(None),
        Some(name) => WearTier::from_name(name)
            .map(Some)
            .ok_or_else(|| EvalError::UnknownWear(name.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Deal labels in evaluation order.
pub const STRATEGY_ORDER: [&str; 7] = [
    "Conservative",
    "Aggressive",
    "Charm Arbitrage",
    "Low Float",
    "High Overpay Potential",
    "Price Anomaly",
    "Float Tier Upgrade",
];

/// Every deal-detection strategy the scanner knows.
#[derive(Debug, Clone)]
pub enum Strategy {
    StickerArbitrage(StickerArbitrage),
    CharmArbitrage(CharmArbitrage),
    PriceAnomaly(PriceAnomaly),
    HighOverpay(HighOverpay),
    LowFloat(LowFloat),
    FloatTierUpgrade(FloatTierUpgrade),
}

impl Strategy {
    /// Label recorded on emitted deals.
    pub fn name(&self) -> &str {
        match self {
            Self::StickerArbitrage(s) => &s.label,
            Self::CharmArbitrage(_) => "Charm Arbitrage",
            Self::PriceAnomaly(_) => "Price Anomaly",
            Self::HighOverpay(_) => "High Overpay Potential",
            Self::LowFloat(_) => "Low Float",
            Self::FloatTierUpgrade(_) => "Float Tier Upgrade",
        }
    }

    /// Evaluate one pre-filtered listing.
    pub async fn evaluate(
        &self,
        listing: &Listing,
        model: &ProfitabilityModel,
        prices: &mut PriceCache,
    ) -> Result<Option<Finding>, EvalError> {
        match self {
            Self::StickerArbitrage(s) => Ok(s.evaluate(listing, model)),
            Self::CharmArbitrage(s) => Ok(s.evaluate(listing, model)),
            Self::PriceAnomaly(s) => Ok(s.evaluate(listing, model)),
            Self::HighOverpay(s) => Ok(s.evaluate(listing)),
            Self::LowFloat(s) => s.evaluate(listing, model, prices).await,
            Self::FloatTierUpgrade(s) => s.evaluate(listing, model, prices).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs the enabled strategies over each fetched batch.
pub struct StrategyEngine {
    strategies: Vec<Strategy>,
    profit_model: ProfitabilityModel,
    included_weapons: Vec<String>,
    item_url_base: String,
}

impl StrategyEngine {
    pub fn new(
        strategies: Vec<Strategy>,
        profit_model: ProfitabilityModel,
        included_weapons: Vec<String>,
        item_url_base: impl Into<String>,
    ) -> Self {
        Self {
            strategies,
            profit_model,
            included_weapons,
            item_url_base: item_url_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the enabled strategies in their fixed evaluation order.
    pub fn from_config(config: &AppConfig) -> Self {
        let s = &config.strategies;
        let mut strategies = Vec::new();

        if s.sticker.conservative_enabled {
            strategies.push(Strategy::StickerArbitrage(StickerArbitrage::new(
                "Conservative",
                s.sticker.conservative.clone(),
            )));
        }
        if s.sticker.aggressive_enabled {
            strategies.push(Strategy::StickerArbitrage(StickerArbitrage::new(
                "Aggressive",
                s.sticker.aggressive.clone(),
            )));
        }
        if s.charm.enabled {
            strategies.push(Strategy::CharmArbitrage(CharmArbitrage::from_config(&s.charm)));
        }
        if s.low_float.enabled {
            strategies.push(Strategy::LowFloat(LowFloat::from_config(&s.low_float)));
        }
        if s.high_overpay.enabled {
            strategies.push(Strategy::HighOverpay(HighOverpay::from_config(&s.high_overpay)));
        }
        if s.price_anomaly.enabled {
            strategies.push(Strategy::PriceAnomaly(PriceAnomaly::from_config(
                &s.price_anomaly,
            )));
        }
        if s.float_tier_upgrade.enabled {
            strategies.push(Strategy::FloatTierUpgrade(FloatTierUpgrade::from_config(
                &s.float_tier_upgrade,
            )));
        }

        Self::new(
            strategies,
            ProfitabilityModel::new(config.profit_targets.clone()),
            config.filters.included_weapons.clone(),
            config.api.item_url_base.clone(),
        )
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(Strategy::name).collect()
    }

    /// Souvenirs and items outside the weapon allow-list are never evaluated.
    pub fn passes_prefilter(&self, listing: &Listing) -> bool {
        if listing.item.is_souvenir() {
            return false;
        }
        let name = listing.name();
        self.included_weapons.iter().any(|w| name.contains(w.as_str()))
    }

    /// Run every strategy over the batch and concatenate the deals, grouped
    /// by strategy in evaluation order.
    pub async fn evaluate_all(&self, listings: &[Listing], prices: &mut PriceCache) -> Vec<Deal> {
        let eligible: Vec<&Listing> = listings
            .iter()
            .filter(|l| self.passes_prefilter(l))
            .collect();
        debug!(
            total = listings.len(),
            eligible = eligible.len(),
            "Pre-filter complete"
        );

        let mut deals = Vec::new();
        for strategy in &self.strategies {
            let before = deals.len();
            for listing in &eligible {
                match strategy.evaluate(listing, &self.profit_model, prices).await {
                    Ok(Some(finding)) => deals.push(self.to_deal(strategy, listing, finding)),
                    Ok(None) => {}
                    Err(e) => warn!(
                        strategy = strategy.name(),
                        listing_id = %listing.id,
                        error = %e,
                        "Listing evaluation failed"
                    ),
                }
            }
            let found = deals.len() - before;
            if found > 0 {
                info!(strategy = strategy.name(), deals = found, "Strategy found deals");
            }
        }
        deals
    }

    fn to_deal(&self, strategy: &Strategy, listing: &Listing, finding: Finding) -> Deal {
        Deal {
            strategy: strategy.name().to_string(),
            listing_id: listing.id.clone(),
            name: listing.name().to_string(),
            image_url: listing.item.icon_url.clone(),
            profit: finding.profit,
            details: finding.details,
            url: format!("{}/{}", self.item_url_base, listing.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fixtures {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::ProfitTier;
    use crate::types::{Decoration, ListingItem, ListingReference, QuotedPrice};

    /// Listing with prices in cents and no decorations.
    pub fn listing(id: &str, name: &str, price: u64, base: u64) -> Listing {
        Listing {
            id: id.to_string(),
            price,
            item: ListingItem {
                market_hash_name: name.to_string(),
                icon_url: Some(format!("icon-{id}")),
                ..Default::default()
            },
            reference: Some(ListingReference {
                base_price: Some(base),
            }),
        }
    }

    pub fn decoration(name: &str, scm_cents: u64) -> Decoration {
        Decoration {
            name: Some(name.to_string()),
            scm: Some(QuotedPrice {
                price: Some(scm_cents),
            }),
            reference: None,
        }
    }

    pub fn with_wear(mut listing: Listing, wear: &str, float: f64) -> Listing {
        listing.item.wear_name = Some(wear.to_string());
        listing.item.float_value = Some(float);
        listing
    }

    /// Accepts $5 or 5% for anything up to $1000.
    pub fn lenient_model() -> ProfitabilityModel {
        ProfitabilityModel::new(vec![ProfitTier {
            max_skin_price: dec!(1000),
            min_profit_usd: dec!(5),
            min_profit_percentage: dec!(5),
        }])
    }

    /// Rejects everything it covers.
    pub fn strict_model() -> ProfitabilityModel {
        ProfitabilityModel::new(vec![ProfitTier {
            max_skin_price: dec!(1000),
            min_profit_usd: dec!(100000),
            min_profit_percentage: dec!(100000),
        }])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
