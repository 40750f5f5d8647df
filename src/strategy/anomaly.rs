//! Price anomaly: listings priced well under their reference value.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::profit::ProfitabilityModel;
use super::Finding;
use crate::config::PriceAnomalyConfig;
use crate::types::Listing;

#[derive(Debug, Clone)]
pub struct PriceAnomaly {
    min_discount_percentage: Decimal,
}

impl PriceAnomaly {
    pub fn new(min_discount_percentage: Decimal) -> Self {
        Self {
            min_discount_percentage,
        }
    }

    pub fn from_config(config: &PriceAnomalyConfig) -> Self {
        Self::new(config.min_discount_percentage)
    }

    pub fn evaluate(&self, listing: &Listing, model: &ProfitabilityModel) -> Option<Finding> {
        let base = listing.base_price();
        if base.is_zero() {
            return None;
        }
        let price = listing.listing_price();
        let discount = (base - price) / base * dec!(100);
        if discount < self.min_discount_percentage {
            return None;
        }

        let profit = base - price;
        if !model.is_profitable(profit, base) {
            return None;
        }

        Some(Finding {
            profit,
            details: json!({
                "Listing Price": price,
                "Market Price": base,
                "Discount": discount.round_dp(2),
            }),
        })
    }
}
