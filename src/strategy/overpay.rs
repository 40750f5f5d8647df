//! High overpay potential.
//!
//! Flags skins listed at roughly base price that carry expensive stickers.
//! Buyers of sticker crafts sometimes overpay heavily, so the reported
//! profit is the raw sticker value and the profit tiers are not applied.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::Finding;
use crate::config::HighOverpayConfig;
use crate::types::{decoration_names, decoration_value, Listing};

#[derive(Debug, Clone)]
pub struct HighOverpay {
    max_price_above_base_percentage: Decimal,
    min_sticker_value: Decimal,
}

impl HighOverpay {
    pub fn new(max_price_above_base_percentage: Decimal, min_sticker_value: Decimal) -> Self {
        Self {
            max_price_above_base_percentage,
            min_sticker_value,
        }
    }

    pub fn from_config(config: &HighOverpayConfig) -> Self {
        Self::new(
            config.max_price_above_base_percentage,
            config.min_sticker_value,
        )
    }

    pub fn evaluate(&self, listing: &Listing) -> Option<Finding> {
        let base = listing.base_price();
        if base.is_zero() {
            return None;
        }
        let price = listing.listing_price();
        let ceiling = base * (Decimal::ONE + self.max_price_above_base_percentage / dec!(100));
        if price > ceiling {
            return None;
        }

        let stickers = listing.item.stickers();
        let sticker_value = decoration_value(stickers);
        if sticker_value < self.min_sticker_value {
            return None;
        }

        Some(Finding {
            profit: sticker_value,
            details: json!({
                "Listing Price": price,
                "Base Skin Value": base,
                "Raw Sticker Value": sticker_value,
                "Stickers": decoration_names(stickers),
            }),
        })
    }
}
