//! Ledger and Platform Records
//!
//! Record types returned by the Horizon ledger API and the Pi platform API.
//! Each type implements [`CachedEntity`](crate::domain::cache::CachedEntity)
//! so it can live in an entity cache.
//!
//! Flat record families (accounts, ledgers, offers...) are their own raw
//! payload: building is a move and patching replaces the fields in place.
//! The two polymorphic families ([`Effect`] and [`Operation`]) are built from
//! a raw record through a static type-tag dispatch table.

mod account;
mod asset;
mod claimable_balance;
mod effect;
mod ledger;
mod offer;
mod operation;
mod payment;
mod trade;
mod transaction;

pub use account::{Account, AccountFlags, Balance, Signer, Thresholds};
pub use asset::{Asset, AssetAccounts, AssetFlags, AssetKey};
pub use claimable_balance::{ClaimableBalance, Claimant};
pub use effect::{
    AccountCreated, AccountFlagsUpdated, AccountHomeDomainUpdated, AccountThresholdsUpdated,
    AssetAmount, ClaimableBalanceEvent, DataEntry, DataRemoved, Effect, EffectKind, EffectRecord,
    SequenceBumped, SignerChange, SponsoredEntry, SponsorshipCreated, SponsorshipRemoved,
    SponsorshipUpdated, TradeEffect, TrustlineAuthorization, TrustlineChange,
    TrustlineFlagsUpdated, effect_tags, operation_id_of,
};
pub use ledger::Ledger;
pub use offer::Offer;
pub use operation::{
    AccountMerge, AllowTrust, BeginSponsoringFutureReserves, BumpSequence, ChangeTrust,
    ClaimClaimableBalance, CreateAccount, CreateClaimableBalance, EndSponsoringFutureReserves,
    ManageData, ManageOffer, Operation, OperationKind, OperationRecord, PathPayment, Payment,
    RevokeSponsorship, SetOptions, operation_tags,
};
pub use payment::{PlatformPayment, PaymentStatus, PaymentTransaction};
pub use trade::Trade;
pub use transaction::Transaction;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Record Families
// =============================================================================

/// One family of cached records, each with its own cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordFamily {
    /// Ledger accounts.
    Accounts,
    /// Issued assets.
    Assets,
    /// Claimable balances.
    ClaimableBalances,
    /// Effects.
    Effects,
    /// Closed ledgers.
    Ledgers,
    /// Open offers.
    Offers,
    /// Operations.
    Operations,
    /// Executed trades.
    Trades,
    /// Transactions.
    Transactions,
    /// Platform payments.
    Payments,
}

impl RecordFamily {
    /// Label used in logs, metrics and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Assets => "assets",
            Self::ClaimableBalances => "claimable_balances",
            Self::Effects => "effects",
            Self::Ledgers => "ledgers",
            Self::Offers => "offers",
            Self::Operations => "operations",
            Self::Trades => "trades",
            Self::Transactions => "transactions",
            Self::Payments => "payments",
        }
    }
}

impl std::fmt::Display for RecordFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Shared Value Types
// =============================================================================

/// Asset identification as Horizon spells it out on most records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// `native`, `credit_alphanum4` or `credit_alphanum12`.
    #[serde(default)]
    pub asset_type: String,
    /// Asset code, absent for the native asset.
    #[serde(default)]
    pub asset_code: Option<String>,
    /// Issuing account, absent for the native asset.
    #[serde(default)]
    pub asset_issuer: Option<String>,
}

impl AssetDescriptor {
    /// Descriptor of the native asset.
    #[must_use]
    pub fn native() -> Self {
        Self {
            asset_type: "native".to_string(),
            asset_code: None,
            asset_issuer: None,
        }
    }

    /// Build a descriptor from loose parts.
    #[must_use]
    pub fn from_parts(
        asset_type: Option<String>,
        asset_code: Option<String>,
        asset_issuer: Option<String>,
    ) -> Self {
        Self {
            asset_type: asset_type.unwrap_or_default(),
            asset_code,
            asset_issuer,
        }
    }

    /// Whether this is the native asset.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.asset_type == "native"
    }

    /// Canonical `code:issuer` form, or `native`.
    #[must_use]
    pub fn canonical(&self) -> String {
        match (&self.asset_code, &self.asset_issuer) {
            (Some(code), Some(issuer)) if !self.is_native() => format!("{code}:{issuer}"),
            _ => "native".to_string(),
        }
    }
}

/// Rational price as `n / d`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRatio {
    /// Numerator.
    #[serde(deserialize_with = "int_or_string")]
    pub n: i64,
    /// Denominator.
    #[serde(deserialize_with = "int_or_string")]
    pub d: i64,
}

impl PriceRatio {
    /// Price as a decimal, `None` when the denominator is zero.
    #[must_use]
    pub fn to_decimal(self) -> Option<Decimal> {
        if self.d == 0 {
            return None;
        }
        Decimal::from(self.n).checked_div(Decimal::from(self.d))
    }
}

/// Accept an integer given either as a JSON number or as a string.
fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(i64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Accept an identifier given either as a JSON string or as a number.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(s) => s,
        Repr::Number(n) => n.to_string(),
    })
}

/// Optional variant of [`id_string`].
fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Text(s)) => Some(s),
        Some(Repr::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_asset_forms() {
        assert_eq!(AssetDescriptor::native().canonical(), "native");

        let credit = AssetDescriptor::from_parts(
            Some("credit_alphanum4".to_string()),
            Some("USD".to_string()),
            Some("GISSUER".to_string()),
        );
        assert_eq!(credit.canonical(), "USD:GISSUER");
        assert!(!credit.is_native());
    }

    #[test]
    fn price_ratio_accepts_strings_and_numbers() {
        let numeric: PriceRatio = serde_json::from_value(json!({"n": 1, "d": 4})).unwrap();
        let textual: PriceRatio = serde_json::from_value(json!({"n": "1", "d": "4"})).unwrap();

        assert_eq!(numeric, textual);
        assert_eq!(numeric.to_decimal(), Some(Decimal::new(25, 2)));
    }

    #[test]
    fn price_ratio_zero_denominator() {
        let ratio = PriceRatio { n: 3, d: 0 };
        assert_eq!(ratio.to_decimal(), None);
    }
}
