//! Charm (keychain) arbitrage.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::profit::{profit_percent, ProfitabilityModel};
use super::Finding;
use crate::config::CharmConfig;
use crate::types::{decoration_names, decoration_value, Listing};

/// Charms can be detached and sold separately, so their value counts in
/// full minus the marketplace sale fee.
#[derive(Debug, Clone)]
pub struct CharmArbitrage {
    sale_fee_percentage: Decimal,
}

impl CharmArbitrage {
    pub fn new(sale_fee_percentage: Decimal) -> Self {
        Self {
            sale_fee_percentage,
        }
    }

    pub fn from_config(config: &CharmConfig) -> Self {
        Self::new(config.sale_fee_percentage)
    }

    pub fn evaluate(&self, listing: &Listing, model: &ProfitabilityModel) -> Option<Finding> {
        let charms = listing.item.keychains();
        if charms.is_empty() {
            return None;
        }
        let base = listing.base_price();
        if base.is_zero() {
            return None;
        }
        let charm_value = decoration_value(charms);
        if charm_value.is_zero() {
            return None;
        }

        let after_fee = charm_value * (Decimal::ONE - self.sale_fee_percentage / dec!(100));
        let price = listing.listing_price();
        let profit = base + after_fee - price;

        if !model.is_profitable(profit, base) {
            return None;
        }

        Some(Finding {
            profit,
            details: json!({
                "Listing Price": price,
                "Base Skin Value": base,
                "Charm Value (After Fee)": after_fee,
                "Charms": decoration_names(charms),
                "Profit Percentage": profit_percent(profit, base).round_dp(2),
            }),
        })
    }
}
