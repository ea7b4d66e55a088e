//! Ledger accounts.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cache::{CacheKey, CachedEntity, Patch};

/// A ledger account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account id (public key).
    pub id: String,
    /// Pagination cursor.
    #[serde(default)]
    pub paging_token: String,
    /// Account id, repeated by Horizon.
    #[serde(default)]
    pub account_id: String,
    /// Current sequence number.
    #[serde(default)]
    pub sequence: String,
    /// Number of subentries (trustlines, offers, signers, data).
    #[serde(default)]
    pub subentry_count: u32,
    /// Home domain, if set.
    #[serde(default)]
    pub home_domain: Option<String>,
    /// Ledger in which the account was last modified.
    #[serde(default)]
    pub last_modified_ledger: u64,
    /// Number of entries this account sponsors.
    #[serde(default)]
    pub num_sponsoring: u32,
    /// Number of entries sponsored for this account.
    #[serde(default)]
    pub num_sponsored: u32,
    /// Sponsor of the account itself.
    #[serde(default)]
    pub sponsor: Option<String>,
    /// Signature thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Authorization flags.
    #[serde(default)]
    pub flags: AccountFlags,
    /// Balances held.
    #[serde(default)]
    pub balances: Vec<Balance>,
    /// Signers.
    #[serde(default)]
    pub signers: Vec<Signer>,
    /// Data entries, base64 encoded.
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Signature weight thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Low threshold.
    #[serde(default)]
    pub low_threshold: u8,
    /// Medium threshold.
    #[serde(default)]
    pub med_threshold: u8,
    /// High threshold.
    #[serde(default)]
    pub high_threshold: u8,
}

/// Account authorization flags.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlags {
    /// Trustlines need issuer authorization.
    #[serde(default)]
    pub auth_required: bool,
    /// Issuer may revoke authorization.
    #[serde(default)]
    pub auth_revocable: bool,
    /// Flags can no longer change.
    #[serde(default)]
    pub auth_immutable: bool,
    /// Issuer may claw back balances.
    #[serde(default)]
    pub auth_clawback_enabled: bool,
}

/// One balance line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Amount held.
    pub balance: Decimal,
    /// Trustline limit, absent for the native asset.
    #[serde(default)]
    pub limit: Option<Decimal>,
    /// Liabilities from buy offers.
    #[serde(default)]
    pub buying_liabilities: Option<Decimal>,
    /// Liabilities from sell offers.
    #[serde(default)]
    pub selling_liabilities: Option<Decimal>,
    /// Sponsor of the trustline.
    #[serde(default)]
    pub sponsor: Option<String>,
    /// Asset the balance is in.
    #[serde(flatten)]
    pub asset: super::AssetDescriptor,
}

/// One account signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Signer key.
    pub key: String,
    /// Signature weight.
    #[serde(default)]
    pub weight: u32,
    /// Signer key type.
    #[serde(default, rename = "type")]
    pub signer_type: String,
    /// Sponsor of the signer entry.
    #[serde(default)]
    pub sponsor: Option<String>,
}

impl Account {
    /// Balance of the native asset, if present.
    #[must_use]
    pub fn native_balance(&self) -> Option<Decimal> {
        self.balances
            .iter()
            .find(|b| b.asset.is_native())
            .map(|b| b.balance)
    }

    /// Whether `key` is one of the account's signers.
    #[must_use]
    pub fn has_signer(&self, key: &str) -> bool {
        self.signers.iter().any(|s| s.key == key)
    }
}

impl CachedEntity for Account {
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
    fn decodes_horizon_account() {
        let account: Account = serde_json::from_value(json!({
            "id": "GAPP",
            "account_id": "GAPP",
            "sequence": "1234",
            "subentry_count": 1,
            "thresholds": {"low_threshold": 0, "med_threshold": 1, "high_threshold": 2},
            "flags": {"auth_required": false, "auth_revocable": true},
            "balances": [
                {"balance": "12.5000000", "asset_type": "native"},
                {"balance": "3", "limit": "100", "asset_type": "credit_alphanum4",
                 "asset_code": "USD", "asset_issuer": "GISSUER"}
            ],
            "signers": [{"key": "GAPP", "weight": 1, "type": "ed25519_public_key"}],
            "_links": {"self": {"href": "https://example.test"}}
        }))
        .unwrap();

        assert_eq!(account.native_balance(), Some(Decimal::new(125, 1)));
        assert_eq!(account.balances[1].asset.canonical(), "USD:GISSUER");
        assert!(account.flags.auth_revocable);
        assert!(account.has_signer("GAPP"));
        assert_eq!(account.thresholds.high_threshold, 2);
    }

    #[test]
    fn patch_replaces_fields() {
        let mut account: Account =
            serde_json::from_value(json!({"id": "GAPP", "sequence": "1"})).unwrap();
        let newer: Account =
            serde_json::from_value(json!({"id": "GAPP", "sequence": "2"})).unwrap();

        assert_eq!(account.patch(newer), Patch::Applied);
        assert_eq!(account.sequence, "2");
    }
}
