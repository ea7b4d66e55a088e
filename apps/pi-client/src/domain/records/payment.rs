//! Platform payments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cache::{CacheKey, CachedEntity, Patch};

/// A payment created through the Pi platform API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPayment {
    /// Payment identifier.
    pub identifier: String,
    /// Amount in Pi.
    #[serde(default)]
    pub amount: Decimal,
    /// Memo attached by the app.
    #[serde(default)]
    pub memo: String,
    /// Arbitrary app metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Paying user.
    #[serde(default)]
    pub user_uid: String,
    /// Recipient ledger address.
    #[serde(default)]
    pub to_address: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Lifecycle flags.
    #[serde(default)]
    pub status: PaymentStatus,
    /// Ledger transaction, once submitted.
    #[serde(default)]
    pub transaction: Option<PaymentTransaction>,
}

/// Lifecycle flags of a platform payment.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatus {
    /// Approved by the developer.
    #[serde(default)]
    pub developer_approved: bool,
    /// Ledger transaction verified by the platform.
    #[serde(default)]
    pub transaction_verified: bool,
    /// Completed by the developer.
    #[serde(default)]
    pub developer_completed: bool,
    /// Cancelled by the platform.
    #[serde(default)]
    pub cancelled: bool,
    /// Cancelled by the user.
    #[serde(default)]
    pub user_cancelled: bool,
}

/// Ledger transaction linked to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Transaction hash.
    pub txid: String,
    /// Whether the platform verified it.
    #[serde(default)]
    pub verified: bool,
}

impl PlatformPayment {
    /// Whether the payment was cancelled by either party.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.status.cancelled || self.status.user_cancelled
    }

    /// Hash of the linked ledger transaction.
    #[must_use]
    pub fn txid(&self) -> Option<&str> {
        self.transaction.as_ref().map(|t| t.txid.as_str())
    }
}

impl CachedEntity for PlatformPayment {
    type Raw = Self;

    fn cache_key(raw: &Self) -> CacheKey {
        raw.identifier.clone()
    }

    fn build(raw: Self) -> Self {
        raw
    }

    /// A payload without transaction info keeps the one already known.
    fn patch(&mut self, mut raw: Self) -> Patch {
        if raw.transaction.is_none() {
            raw.transaction = self.transaction.take();
        }
        *self = raw;
        Patch::Applied
    }
}
