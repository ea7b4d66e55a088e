//! Closed ledgers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cache::{CacheKey, CachedEntity, Patch};

/// A closed ledger, keyed by sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Ledger id (hash-derived).
    #[serde(default)]
    pub id: String,
    /// Pagination cursor.
    #[serde(default)]
    pub paging_token: String,
    /// Ledger hash.
    #[serde(default)]
    pub hash: String,
    /// Hash of the previous ledger.
    #[serde(default)]
    pub prev_hash: Option<String>,
    /// Sequence number.
    pub sequence: u64,
    /// Successful transactions in the ledger.
    #[serde(default, alias = "transaction_count")]
    pub successful_transaction_count: u32,
    /// Failed transactions in the ledger.
    #[serde(default)]
    pub failed_transaction_count: u32,
    /// Operations in successful transactions.
    #[serde(default)]
    pub operation_count: u32,
    /// Operations in the whole transaction set.
    #[serde(default)]
    pub tx_set_operation_count: Option<u32>,
    /// Close time.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Total coins in existence.
    #[serde(default)]
    pub total_coins: Decimal,
    /// Fee pool.
    #[serde(default)]
    pub fee_pool: Decimal,
    /// Base fee in stroops.
    #[serde(default)]
    pub base_fee_in_stroops: u64,
    /// Base reserve in stroops.
    #[serde(default)]
    pub base_reserve_in_stroops: u64,
    /// Maximum transaction set size.
    #[serde(default)]
    pub max_tx_set_size: u32,
    /// Protocol version.
    #[serde(default)]
    pub protocol_version: u32,
    /// Base64 ledger header XDR.
    #[serde(default)]
    pub header_xdr: String,
}

impl CachedEntity for Ledger {
    type Raw = Self;

    fn cache_key(raw: &Self) -> CacheKey {
        raw.sequence.to_string()
    }

    fn build(raw: Self) -> Self {
        raw
    }

    fn patch(&mut self, raw: Self) -> Patch {
        *self = raw;
        Patch::Applied
    }
}
