//! Executed trades.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AssetDescriptor, PriceRatio};
use crate::domain::cache::{CacheKey, CachedEntity, Patch};

/// A trade between two offers or an offer and a path payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Trade id, `{operation id}-{index}`.
    pub id: String,
    /// Pagination cursor.
    #[serde(default)]
    pub paging_token: String,
    /// Close time of the ledger holding the trade.
    #[serde(default)]
    pub ledger_close_time: Option<DateTime<Utc>>,
    /// Base side offer id.
    #[serde(default, deserialize_with = "super::opt_id_string")]
    pub base_offer_id: Option<String>,
    /// Base side account.
    #[serde(default)]
    pub base_account: Option<String>,
    /// Base side amount.
    #[serde(default)]
    pub base_amount: Decimal,
    /// Base asset type.
    #[serde(default)]
    pub base_asset_type: Option<String>,
    /// Base asset code.
    #[serde(default)]
    pub base_asset_code: Option<String>,
    /// Base asset issuer.
    #[serde(default)]
    pub base_asset_issuer: Option<String>,
    /// Counter side offer id.
    #[serde(default, deserialize_with = "super::opt_id_string")]
    pub counter_offer_id: Option<String>,
    /// Counter side account.
    #[serde(default)]
    pub counter_account: Option<String>,
    /// Counter side amount.
    #[serde(default)]
    pub counter_amount: Decimal,
    /// Counter asset type.
    #[serde(default)]
    pub counter_asset_type: Option<String>,
    /// Counter asset code.
    #[serde(default)]
    pub counter_asset_code: Option<String>,
    /// Counter asset issuer.
    #[serde(default)]
    pub counter_asset_issuer: Option<String>,
    /// Price of the base asset in counter units.
    #[serde(default)]
    pub price: PriceRatio,
    /// Whether the base side sold.
    #[serde(default)]
    pub base_is_seller: bool,
}

impl Trade {
    /// Id of the operation that produced this trade.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }

    /// Base side asset.
    #[must_use]
    pub fn base_asset(&self) -> AssetDescriptor {
        AssetDescriptor::from_parts(
            self.base_asset_type.clone(),
            self.base_asset_code.clone(),
            self.base_asset_issuer.clone(),
        )
    }

    /// Counter side asset.
    #[must_use]
    pub fn counter_asset(&self) -> AssetDescriptor {
        AssetDescriptor::from_parts(
            self.counter_asset_type.clone(),
            self.counter_asset_code.clone(),
            self.counter_asset_issuer.clone(),
        )
    }
}

impl CachedEntity for Trade {
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
