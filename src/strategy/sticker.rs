//! Sticker arbitrage.
//!
//! A listing priced close to its bare-skin value can carry stickers worth
//! far more than the seller is charging for them. Only a share of that
//! sticker value survives a resale, so each variant applies its own
//! retention table keyed by skin price.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::profit::{profit_percent, ProfitabilityModel};
use super::Finding;
use crate::config::RetentionTier;
use crate::types::{decoration_names, decoration_value, Listing};

#[derive(Debug, Clone)]
pub struct StickerArbitrage {
    pub label: String,
    /// Ascending by `max_skin_price`.
    retention: Vec<RetentionTier>,
}

impl StickerArbitrage {
    pub fn new(label: impl Into<String>, retention: Vec<RetentionTier>) -> Self {
        let mut retention = retention;
        retention.sort_by(|a, b| a.max_skin_price.cmp(&b.max_skin_price));
        Self {
            label: label.into(),
            retention,
        }
    }

    /// Retention percentage for a skin at `base_price`, if any bracket covers it.
    pub fn retention_for(&self, base_price: Decimal) -> Option<Decimal> {
        self.retention
            .iter()
            .find(|t| base_price <= t.max_skin_price)
            .map(|t| t.retention)
    }

    pub fn evaluate(&self, listing: &Listing, model: &ProfitabilityModel) -> Option<Finding> {
        let base = listing.base_price();
        if base.is_zero() {
            return None;
        }
        let stickers = listing.item.stickers();
        let sticker_value = decoration_value(stickers);
        if sticker_value.is_zero() {
            return None;
        }

        let retention = self.retention_for(base).filter(|r| !r.is_zero())?;
        let retained = sticker_value * retention / dec!(100);
        let price = listing.listing_price();
        let profit = base + retained - price;

        if !model.is_profitable(profit, base) {
            return None;
        }

        Some(Finding {
            profit,
            details: json!({
                "Listing Price": price,
                "Base Skin Value": base,
                "Retained Sticker Value": retained,
                "Total Sticker Value": sticker_value,
                "Stickers": decoration_names(stickers),
                "Profit Percentage": profit_percent(profit, base).round_dp(2),
            }),
        })
    }
}
