//! Issued assets.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AssetDescriptor;
use crate::domain::cache::{CacheKey, CachedEntity, Patch};

/// An asset issued on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Asset type, code and issuer.
    #[serde(flatten)]
    pub descriptor: AssetDescriptor,
    /// Pagination cursor.
    #[serde(default)]
    pub paging_token: String,
    /// Total amount issued to authorized holders.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Number of authorized holders.
    #[serde(default)]
    pub num_accounts: u64,
    /// Holder counts by authorization state.
    #[serde(default)]
    pub accounts: AssetAccounts,
    /// Issuer flags.
    #[serde(default)]
    pub flags: AssetFlags,
}

/// Holder counts of an asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAccounts {
    /// Fully authorized holders.
    #[serde(default)]
    pub authorized: u64,
    /// Holders authorized to maintain liabilities only.
    #[serde(default)]
    pub authorized_to_maintain_liabilities: u64,
    /// Unauthorized holders.
    #[serde(default)]
    pub unauthorized: u64,
}

/// Issuer flags of an asset.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFlags {
    /// Holders need authorization.
    #[serde(default)]
    pub auth_required: bool,
    /// Authorization may be revoked.
    #[serde(default)]
    pub auth_revocable: bool,
    /// Flags are frozen.
    #[serde(default)]
    pub auth_immutable: bool,
    /// Balances may be clawed back.
    #[serde(default)]
    pub auth_clawback_enabled: bool,
}

/// Parsed `code:issuer` cache key of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey {
    /// Asset code.
    pub code: String,
    /// Issuing account.
    pub issuer: String,
}

impl AssetKey {
    /// Parse a `code:issuer` key.
    ///
    /// Returns `None` unless both parts are present and non-empty.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        let (code, issuer) = key.split_once(':')?;
        if code.is_empty() || issuer.is_empty() || issuer.contains(':') {
            return None;
        }
        Some(Self {
            code: code.to_string(),
            issuer: issuer.to_string(),
        })
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code, self.issuer)
    }
}

impl Asset {
    /// Asset code, empty for the native asset.
    #[must_use]
    pub fn code(&self) -> &str {
        self.descriptor.asset_code.as_deref().unwrap_or_default()
    }

    /// Issuing account, empty for the native asset.
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.descriptor.asset_issuer.as_deref().unwrap_or_default()
    }
}

impl CachedEntity for Asset {
    type Raw = Self;

    fn cache_key(raw: &Self) -> CacheKey {
        raw.descriptor.canonical()
    }

    fn build(raw: Self) -> Self {
        raw
    }

    fn patch(&mut self, raw: Self) -> Patch {
        *self = raw;
        Patch::Applied
    }
}
