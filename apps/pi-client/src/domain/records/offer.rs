//! Open offers on the decentralized exchange.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AssetDescriptor, PriceRatio};
use crate::domain::cache::{CacheKey, CachedEntity, Patch};

/// An open offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Offer id.
    #[serde(deserialize_with = "super::id_string")]
    pub id: String,
    /// Pagination cursor.
    #[serde(default)]
    pub paging_token: String,
    /// Account that created the offer.
    #[serde(default)]
    pub seller: String,
    /// Asset being sold.
    #[serde(default)]
    pub selling: AssetDescriptor,
    /// Asset being bought.
    #[serde(default)]
    pub buying: AssetDescriptor,
    /// Amount of `selling` on offer.
    #[serde(default)]
    pub amount: Decimal,
    /// Price as a ratio.
    #[serde(default)]
    pub price_r: PriceRatio,
    /// Price as a decimal.
    #[serde(default)]
    pub price: Decimal,
    /// Ledger in which the offer was last modified.
    #[serde(default)]
    pub last_modified_ledger: u64,
    /// Close time of that ledger.
    #[serde(default)]
    pub last_modified_time: Option<DateTime<Utc>>,
    /// Sponsor of the offer entry.
    #[serde(default)]
    pub sponsor: Option<String>,
}

impl CachedEntity for Offer {
    type Raw = Self;

    fn cache_key(raw: &Self) -> CacheKey {
        raw.id.clone()
    }

    fn build(raw: Self) -> Self {
        raw
    }

    fn patch(&mut self, raw: Self) -> Patch {
        *self = raw;
        Patch::Applied
    }
}
