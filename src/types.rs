//! Shared types for the SKINSCOUT scanner.
//!
//! These types form the data model used across all modules: the
//! listing shape returned by the CSFloat feed, wear tiers, and the
//! `Deal` records handed to the store.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Convert an API amount in minor units (cents) to dollars.
pub fn cents_to_usd(cents: u64) -> Decimal {
    Decimal::from(cents) / dec!(100)
}

// ---------------------------------------------------------------------------
// Listing (CSFloat feed entry)
// ---------------------------------------------------------------------------

/// A single buy-now listing from the feed.
///
/// Only the fields the strategies read are deserialized. Everything that
/// may be absent or `null` upstream is optional so that one odd entry does
/// not fail the whole page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: String,
    /// Listing price in cents.
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub item: ListingItem,
    #[serde(default)]
    pub reference: Option<ListingReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingItem {
    #[serde(default)]
    pub market_hash_name: String,
    #[serde(default)]
    pub wear_name: Option<String>,
    #[serde(default)]
    pub float_value: Option<f64>,
    #[serde(default)]
    pub is_souvenir: Option<bool>,
    #[serde(default)]
    pub stickers: Option<Vec<Decoration>>,
    #[serde(default)]
    pub keychains: Option<Vec<Decoration>>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// A sticker or keychain applied to the item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Decoration {
    #[serde(default)]
    pub name: Option<String>,
    /// Steam Community Market quote.
    #[serde(default)]
    pub scm: Option<QuotedPrice>,
    #[serde(default)]
    pub reference: Option<QuotedPrice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuotedPrice {
    /// Price in cents.
    #[serde(default)]
    pub price: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingReference {
    /// Reference value of the bare skin in cents.
    #[serde(default)]
    pub base_price: Option<u64>,
}

impl Decoration {
    /// Market price in cents: the SCM quote when it is non-zero, the
    /// reference quote otherwise.
    pub fn price_cents(&self) -> u64 {
        self.scm
            .as_ref()
            .and_then(|q| q.price)
            .filter(|p| *p > 0)
            .or_else(|| self.reference.as_ref().and_then(|q| q.price))
            .unwrap_or(0)
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_default()
    }
}

/// Sum of decoration prices in dollars. Added up in `Decimal`, so any
/// combination of `u64` cent prices fits.
pub fn decoration_value(decorations: &[Decoration]) -> Decimal {
    decorations.iter().map(|d| cents_to_usd(d.price_cents())).sum()
}

/// Decoration names for deal details.
pub fn decoration_names(decorations: &[Decoration]) -> Vec<String> {
    decorations.iter().map(Decoration::display_name).collect()
}

impl ListingItem {
    pub fn stickers(&self) -> &[Decoration] {
        self.stickers.as_deref().unwrap_or(&[])
    }

    pub fn keychains(&self) -> &[Decoration] {
        self.keychains.as_deref().unwrap_or(&[])
    }

    pub fn is_souvenir(&self) -> bool {
        self.is_souvenir.unwrap_or(false)
    }
}

impl Listing {
    pub fn listing_price(&self) -> Decimal {
        cents_to_usd(self.price)
    }

    /// Reference value in dollars, zero when the feed has none.
    pub fn base_price(&self) -> Decimal {
        cents_to_usd(
            self.reference
                .as_ref()
                .and_then(|r| r.base_price)
                .unwrap_or(0),
        )
    }

    pub fn name(&self) -> &str {
        &self.item.market_hash_name
    }
}

// ---------------------------------------------------------------------------
// Wear tiers
// ---------------------------------------------------------------------------

/// Exterior wear bands, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WearTier {
    FactoryNew,
    MinimalWear,
    FieldTested,
    WellWorn,
    BattleScarred,
}

impl WearTier {
    pub const ALL: [WearTier; 5] = [
        WearTier::FactoryNew,
        WearTier::MinimalWear,
        WearTier::FieldTested,
        WearTier::WellWorn,
        WearTier::BattleScarred,
    ];

    /// Parse the feed's `wear_name`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Factory New" => Some(Self::FactoryNew),
            "Minimal Wear" => Some(Self::MinimalWear),
            "Field-Tested" => Some(Self::FieldTested),
            "Well-Worn" => Some(Self::WellWorn),
            "Battle-Scarred" => Some(Self::BattleScarred),
            _ => None,
        }
    }

    /// Lowest float inside this tier.
    pub fn min_float(&self) -> f64 {
        match self {
            Self::FactoryNew => 0.00,
            Self::MinimalWear => 0.07,
            Self::FieldTested => 0.15,
            Self::WellWorn => 0.38,
            Self::BattleScarred => 0.45,
        }
    }

    /// Upper float bound (exclusive): the next worse tier's minimum.
    pub fn max_float(&self) -> f64 {
        self.worse().map(|w| w.min_float()).unwrap_or(1.0)
    }

    /// The tier one step toward Factory New.
    pub fn better(&self) -> Option<Self> {
        match self {
            Self::FactoryNew => None,
            Self::MinimalWear => Some(Self::FactoryNew),
            Self::FieldTested => Some(Self::MinimalWear),
            Self::WellWorn => Some(Self::FieldTested),
            Self::BattleScarred => Some(Self::WellWorn),
        }
    }

    pub fn worse(&self) -> Option<Self> {
        match self {
            Self::FactoryNew => Some(Self::MinimalWear),
            Self::MinimalWear => Some(Self::FieldTested),
            Self::FieldTested => Some(Self::WellWorn),
            Self::WellWorn => Some(Self::BattleScarred),
            Self::BattleScarred => None,
        }
    }

    /// Position of `float` inside this tier, 0.0 at the best edge.
    pub fn range_position(&self, float: f64) -> Option<f64> {
        let span = self.max_float() - self.min_float();
        if span <= 0.0 || float < self.min_float() || float > self.max_float() {
            return None;
        }
        Some((float - self.min_float()) / span)
    }
}

impl fmt::Display for WearTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FactoryNew => write!(f, "Factory New"),
            Self::MinimalWear => write!(f, "Minimal Wear"),
            Self::FieldTested => write!(f, "Field-Tested"),
            Self::WellWorn => write!(f, "Well-Worn"),
            Self::BattleScarred => write!(f, "Battle-Scarred"),
        }
    }
}

/// Drop every parenthesised segment (`" (Field-Tested)"`) from a market name.
pub fn strip_wear_suffix(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(start) = rest.find(" (") {
        match rest[start..].find(')') {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + end + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Market name of the same skin in another wear tier.
pub fn name_in_tier(name: &str, tier: WearTier) -> String {
    format!("{} ({tier})", strip_wear_suffix(name))
}

// ---------------------------------------------------------------------------
// Deal
// ---------------------------------------------------------------------------

/// An opportunity emitted by a strategy for one listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deal {
    pub strategy: String,
    pub listing_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub profit: Decimal,
    /// Strategy-specific figures, always a JSON object.
    pub details: serde_json::Value,
    pub url: String,
}

impl fmt::Display for Deal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<22} | Profit: ${:.2} | Item: {}",
            self.strategy, self.profit, self.name
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
