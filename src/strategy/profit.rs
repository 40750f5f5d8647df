//! Dynamic profit targets.
//!
//! Cheap skins must clear a percentage bar, expensive ones an absolute
//! dollar bar; each bracket accepts a deal that meets either.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::ProfitTier;

/// The profitability gate shared by every strategy except high overpay.
#[derive(Debug, Clone, Default)]
pub struct ProfitabilityModel {
    tiers: Vec<ProfitTier>,
}

impl ProfitabilityModel {
    /// Tiers are consulted in the order given.
    pub fn new(tiers: Vec<ProfitTier>) -> Self {
        Self { tiers }
    }

    /// The first tier covering `base_price` decides; later tiers are never
    /// consulted, even when the first one rejects.
    pub fn is_profitable(&self, profit: Decimal, base_price: Decimal) -> bool {
        if base_price <= Decimal::ZERO {
            return false;
        }
        let pct = profit_percent(profit, base_price);

        match self.tiers.iter().find(|t| base_price <= t.max_skin_price) {
            Some(tier) => profit >= tier.min_profit_usd || pct >= tier.min_profit_percentage,
            None => false,
        }
    }

    pub fn tiers(&self) -> &[ProfitTier] {
        &self.tiers
    }
}

/// `profit / base * 100`, zero when the base is not positive.
pub fn profit_percent(profit: Decimal, base: Decimal) -> Decimal {
    if base <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    profit / base * dec!(100)
}
