//! Ledger transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cache::{CacheKey, CachedEntity, Patch};

/// A submitted transaction, keyed by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id (same as hash).
    pub id: String,
    /// Pagination cursor.
    #[serde(default)]
    pub paging_token: String,
    /// Whether the transaction succeeded.
    #[serde(default = "default_true")]
    pub successful: bool,
    /// Transaction hash.
    #[serde(default)]
    pub hash: String,
    /// Sequence of the ledger holding the transaction.
    #[serde(default)]
    pub ledger: u64,
    /// Submission time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Source account.
    #[serde(default)]
    pub source_account: String,
    /// Source account sequence consumed.
    #[serde(default)]
    pub source_account_sequence: String,
    /// Account that paid the fee.
    #[serde(default)]
    pub fee_account: Option<String>,
    /// Fee charged, in stroops.
    #[serde(default)]
    pub fee_charged: String,
    /// Maximum fee offered, in stroops.
    #[serde(default)]
    pub max_fee: String,
    /// Number of operations.
    #[serde(default)]
    pub operation_count: u32,
    /// Base64 envelope XDR.
    #[serde(default)]
    pub envelope_xdr: String,
    /// Base64 result XDR.
    #[serde(default)]
    pub result_xdr: String,
    /// Base64 result meta XDR.
    #[serde(default)]
    pub result_meta_xdr: String,
    /// Base64 fee meta XDR.
    #[serde(default)]
    pub fee_meta_xdr: String,
    /// Memo type (`none`, `text`, `id`, `hash`, `return`).
    #[serde(default)]
    pub memo_type: String,
    /// Memo value.
    #[serde(default)]
    pub memo: Option<String>,
    /// Signatures.
    #[serde(default)]
    pub signatures: Vec<String>,
}

const fn default_true() -> bool {
    true
}

impl CachedEntity for Transaction {
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_memo_and_defaults() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": "deadbeef",
            "hash": "deadbeef",
            "ledger": 12,
            "source_account": "GSRC",
            "memo_type": "text",
            "memo": "payment-1",
            "signatures": ["sig"]
        }))
        .unwrap();

        assert!(tx.successful);
        assert_eq!(tx.memo.as_deref(), Some("payment-1"));
        assert_eq!(Transaction::cache_key(&tx), "deadbeef");
    }
}
