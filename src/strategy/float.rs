//! Float-based strategies.
//!
//! Both look at items whose float sits near the better edge of their wear
//! tier and price them against the next better tier, fetched through the
//! price cache.
//!
//! - `LowFloat` measures the float's relative position inside the tier and
//!   values the listing by a retained share of the tier price gap.
//! - `FloatTierUpgrade` uses an absolute distance to the tier minimum and
//!   compares the listing directly with the better tier's price.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use tracing::debug;

use super::profit::{profit_percent, ProfitabilityModel};
use super::{wear_tier_of, EvalError, Finding};
use crate::config::{FloatTierUpgradeConfig, LowFloatConfig};
use crate::pricing::PriceCache;
use crate::types::{name_in_tier, Listing, WearTier};

/// Wear tier and float of a non-Factory-New listing, with the float
/// checked against the tier's range. `Ok(None)` when either is missing.
fn upgradeable(listing: &Listing) -> Result<Option<(WearTier, WearTier, f64)>, EvalError> {
    let Some(tier) = wear_tier_of(listing)? else {
        return Ok(None);
    };
    let Some(better) = tier.better() else {
        return Ok(None);
    };
    let Some(float) = listing.item.float_value else {
        return Ok(None);
    };
    if tier.range_position(float).is_none() {
        return Err(EvalError::FloatOutOfRange { float, tier });
    }
    Ok(Some((tier, better, float)))
}

// ---------------------------------------------------------------------------
// Low float
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LowFloat {
    min_price_gap_usd: Decimal,
    /// Fraction of the tier range, 0.0..=1.0.
    top_fraction: f64,
    premium_retention_percentage: Decimal,
}

impl LowFloat {
    pub fn from_config(config: &LowFloatConfig) -> Self {
        Self {
            min_price_gap_usd: config.min_price_gap_usd,
            top_fraction: config.top_percentile_threshold / 100.0,
            premium_retention_percentage: config.premium_retention_percentage,
        }
    }

    pub async fn evaluate(
        &self,
        listing: &Listing,
        model: &ProfitabilityModel,
        prices: &mut PriceCache,
    ) -> Result<Option<Finding>, EvalError> {
        let Some((tier, better, float)) = upgradeable(listing)? else {
            return Ok(None);
        };
        let position = tier
            .range_position(float)
            .ok_or(EvalError::FloatOutOfRange { float, tier })?;
        if position > self.top_fraction {
            return Ok(None);
        }

        let market_price = listing.base_price();
        if market_price.is_zero() {
            return Ok(None);
        }
        let next_tier_price = prices.get_price(&name_in_tier(listing.name(), better)).await;
        if next_tier_price.is_zero() {
            return Ok(None);
        }

        let gap = next_tier_price - market_price;
        if gap < self.min_price_gap_usd {
            debug!(listing_id = %listing.id, %gap, "Tier price gap too small");
            return Ok(None);
        }

        let price = listing.listing_price();
        let premium_paid = price - market_price;
        let profit = gap * self.premium_retention_percentage / dec!(100) - premium_paid;
        if !model.is_profitable(profit, market_price) {
            return Ok(None);
        }

        Ok(Some(Finding {
            profit,
            details: json!({
                "Float": float,
                "Listing Price": price,
                "Market Price": market_price,
                "Next Tier Price": next_tier_price,
                "Premium Paid": premium_paid,
                "Profit Percentage": profit_percent(profit, market_price).round_dp(2),
            }),
        }))
    }
}

// ---------------------------------------------------------------------------
// Float tier upgrade
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FloatTierUpgrade {
    max_float_premium_percentage: Decimal,
    float_proximity_threshold: f64,
}

impl FloatTierUpgrade {
    pub fn from_config(config: &FloatTierUpgradeConfig) -> Self {
        Self {
            max_float_premium_percentage: config.max_float_premium_percentage,
            float_proximity_threshold: config.float_proximity_threshold,
        }
    }

    /// True when `float` is within the proximity threshold of the tier minimum.
    pub fn is_near_boundary(&self, tier: WearTier, float: f64) -> bool {
        float < tier.min_float() + self.float_proximity_threshold
    }

    pub async fn evaluate(
        &self,
        listing: &Listing,
        model: &ProfitabilityModel,
        prices: &mut PriceCache,
    ) -> Result<Option<Finding>, EvalError> {
        if listing.item.is_souvenir() {
            return Ok(None);
        }
        let Some((tier, better, float)) = upgradeable(listing)? else {
            return Ok(None);
        };
        if !self.is_near_boundary(tier, float) {
            return Ok(None);
        }

        let price = listing.listing_price();
        let current_tier_price = listing.base_price();
        let ceiling =
            current_tier_price * (Decimal::ONE + self.max_float_premium_percentage / dec!(100));
        if current_tier_price > Decimal::ZERO && price > ceiling {
            return Ok(None);
        }

        let next_tier_price = prices.get_price(&name_in_tier(listing.name(), better)).await;
        if next_tier_price.is_zero() {
            return Ok(None);
        }

        let profit = next_tier_price - price;
        if !model.is_profitable(profit, price) {
            return Ok(None);
        }

        Ok(Some(Finding {
            profit,
            details: json!({
                "Float": float,
                "Listing Price": price,
                "Current Tier Price": current_tier_price,
                "Next Tier Price": next_tier_price,
                "Profit Percentage": profit_percent(profit, price).round_dp(2),
            }),
        }))
    }
}
