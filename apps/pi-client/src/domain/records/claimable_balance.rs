//! Claimable balances.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cache::{CacheKey, CachedEntity, Patch};

/// A balance that can be claimed by one of its claimants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimableBalance {
    /// Balance id.
    pub id: String,
    /// Pagination cursor.
    #[serde(default)]
    pub paging_token: String,
    /// Canonical asset string (`native` or `code:issuer`).
    #[serde(default)]
    pub asset: String,
    /// Amount held.
    #[serde(default)]
    pub amount: Decimal,
    /// Sponsor of the balance entry.
    #[serde(default)]
    pub sponsor: Option<String>,
    /// Ledger in which the balance was last modified.
    #[serde(default)]
    pub last_modified_ledger: u64,
    /// Close time of that ledger.
    #[serde(default)]
    pub last_modified_time: Option<DateTime<Utc>>,
    /// Accounts allowed to claim the balance.
    #[serde(default)]
    pub claimants: Vec<Claimant>,
}

/// A claimant and the predicate guarding its claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claimant {
    /// Claiming account.
    pub destination: String,
    /// Claim predicate, kept in its JSON form.
    #[serde(default)]
    pub predicate: serde_json::Value,
}

impl ClaimableBalance {
    /// Whether `account` may claim this balance.
    #[must_use]
    pub fn is_claimable_by(&self, account: &str) -> bool {
        self.claimants.iter().any(|c| c.destination == account)
    }
}

impl CachedEntity for ClaimableBalance {
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
