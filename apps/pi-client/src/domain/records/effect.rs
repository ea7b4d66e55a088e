//! Ledger Effects
//!
//! Effects are the state changes an operation caused. Horizon tags every
//! effect with a `type` string; the detail fields depend on that tag.
//!
//! [`EffectRecord`] is the raw payload: base fields plus the untyped detail
//! map. [`Effect::from_record`] looks the tag up in a static dispatch table
//! and decodes the details into the matching [`EffectKind`] variant. Unknown
//! tags, and details that do not decode, yield [`EffectKind::Generic`]
//! carrying the detail map as-is.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::AssetDescriptor;
use crate::domain::cache::{CacheKey, CachedEntity, Patch};

// =============================================================================
// Raw Record
// =============================================================================

/// Raw effect payload as delivered by Horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRecord {
    /// Effect id, `{operation id}-{index}` zero padded.
    pub id: String,
    /// Pagination cursor.
    #[serde(default)]
    pub paging_token: String,
    /// Type tag.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Numeric type code.
    #[serde(default)]
    pub type_i: u32,
    /// Account the effect applies to.
    #[serde(default)]
    pub account: String,
    /// Time of the ledger that produced the effect.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Tag-specific fields.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

// =============================================================================
// Effect Variants
// =============================================================================

/// `account_created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreated {
    /// Balance the account was funded with.
    pub starting_balance: Decimal,
}

/// `account_credited` and `account_debited`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    /// Amount moved.
    pub amount: Decimal,
    /// Asset moved.
    #[serde(flatten)]
    pub asset: AssetDescriptor,
}

/// `account_thresholds_updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountThresholdsUpdated {
    /// New low threshold.
    pub low_threshold: u8,
    /// New medium threshold.
    pub med_threshold: u8,
    /// New high threshold.
    pub high_threshold: u8,
}

/// `account_home_domain_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHomeDomainUpdated {
    /// New home domain.
    pub home_domain: String,
}

/// `account_flags_updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlagsUpdated {
    /// New `auth_required` value, when changed.
    #[serde(default)]
    pub auth_required_flag: Option<bool>,
    /// New `auth_revocable` value, when changed.
    #[serde(default)]
    pub auth_revokable_flag: Option<bool>,
}

/// `signer_created`, `signer_updated` and `signer_removed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerChange {
    /// Signer weight.
    pub weight: u32,
    /// Signer public key.
    pub public_key: String,
    /// Signer key in its typed form.
    #[serde(default)]
    pub key: String,
}

/// `trustline_created`, `trustline_updated` and `trustline_removed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustlineChange {
    /// Trustline limit.
    pub limit: Decimal,
    /// Trusted asset.
    #[serde(flatten)]
    pub asset: AssetDescriptor,
}

/// `trustline_authorized`, `trustline_deauthorized` and
/// `trustline_authorized_to_maintain_liabilities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustlineAuthorization {
    /// Account holding the trustline.
    pub trustor: String,
    /// Asset type.
    pub asset_type: String,
    /// Asset code.
    #[serde(default)]
    pub asset_code: Option<String>,
}

/// `trustline_flags_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustlineFlagsUpdated {
    /// Account holding the trustline.
    pub trustor: String,
    /// Asset of the trustline.
    #[serde(flatten)]
    pub asset: AssetDescriptor,
    /// New `authorized` flag.
    #[serde(default)]
    pub authorized_flag: Option<bool>,
    /// New `authorized_to_maintain_liabilities` flag.
    #[serde(default, rename = "authorized_to_maintain_liabilites_flag")]
    pub authorized_to_maintain_liabilities_flag: Option<bool>,
    /// New `clawback_enabled` flag.
    #[serde(default)]
    pub clawback_enabled_flag: Option<bool>,
}

/// `trade`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEffect {
    /// Counterparty that sold.
    pub seller: String,
    /// Offer matched.
    #[serde(deserialize_with = "super::id_string")]
    pub offer_id: String,
    /// Amount bought.
    pub bought_amount: Decimal,
    /// Bought asset type.
    pub bought_asset_type: String,
    /// Bought asset code.
    #[serde(default)]
    pub bought_asset_code: Option<String>,
    /// Bought asset issuer.
    #[serde(default)]
    pub bought_asset_issuer: Option<String>,
    /// Amount sold.
    pub sold_amount: Decimal,
    /// Sold asset type.
    pub sold_asset_type: String,
    /// Sold asset code.
    #[serde(default)]
    pub sold_asset_code: Option<String>,
    /// Sold asset issuer.
    #[serde(default)]
    pub sold_asset_issuer: Option<String>,
}

impl TradeEffect {
    /// Asset bought.
    #[must_use]
    pub fn bought_asset(&self) -> AssetDescriptor {
        AssetDescriptor::from_parts(
            Some(self.bought_asset_type.clone()),
            self.bought_asset_code.clone(),
            self.bought_asset_issuer.clone(),
        )
    }

    /// Asset sold.
    #[must_use]
    pub fn sold_asset(&self) -> AssetDescriptor {
        AssetDescriptor::from_parts(
            Some(self.sold_asset_type.clone()),
            self.sold_asset_code.clone(),
            self.sold_asset_issuer.clone(),
        )
    }
}

/// `data_created` and `data_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    /// Entry name.
    pub name: String,
    /// Base64 entry value.
    #[serde(default)]
    pub value: String,
}

/// `data_removed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRemoved {
    /// Entry name.
    pub name: String,
}

/// `sequence_bumped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceBumped {
    /// New sequence number.
    #[serde(deserialize_with = "super::id_string")]
    pub new_seq: String,
}

/// `claimable_balance_created`, `claimable_balance_claimant_created` and
/// `claimable_balance_claimed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimableBalanceEvent {
    /// Balance id.
    #[serde(default)]
    pub balance_id: String,
    /// Canonical asset string.
    pub asset: String,
    /// Amount.
    pub amount: Decimal,
    /// Claim predicate, for claimant effects.
    #[serde(default)]
    pub predicate: Option<Value>,
}

/// Ledger entry a sponsorship effect is about.
///
/// At most one field is set, depending on the sponsorship family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsoredEntry {
    /// Trustline asset.
    #[serde(default)]
    pub asset: Option<String>,
    /// Data entry name.
    #[serde(default)]
    pub data_name: Option<String>,
    /// Claimable balance id.
    #[serde(default)]
    pub balance_id: Option<String>,
    /// Signer key.
    #[serde(default)]
    pub signer: Option<String>,
}

/// `*_sponsorship_created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipCreated {
    /// New sponsor.
    pub sponsor: String,
    /// Sponsored entry.
    #[serde(flatten)]
    pub entry: SponsoredEntry,
}

/// `*_sponsorship_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipUpdated {
    /// Previous sponsor.
    pub former_sponsor: String,
    /// New sponsor.
    pub new_sponsor: String,
    /// Sponsored entry.
    #[serde(flatten)]
    pub entry: SponsoredEntry,
}

/// `*_sponsorship_removed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipRemoved {
    /// Previous sponsor.
    pub former_sponsor: String,
    /// Sponsored entry.
    #[serde(flatten)]
    pub entry: SponsoredEntry,
}

/// Concrete effect, selected by type tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EffectKind {
    /// `account_created`.
    AccountCreated(AccountCreated),
    /// `account_credited`.
    AccountCredited(AssetAmount),
    /// `account_debited`.
    AccountDebited(AssetAmount),
    /// `account_thresholds_updated`.
    AccountThresholdsUpdated(AccountThresholdsUpdated),
    /// `account_home_domain_updated`.
    AccountHomeDomainUpdated(AccountHomeDomainUpdated),
    /// `account_flags_updated`.
    AccountFlagsUpdated(AccountFlagsUpdated),
    /// `signer_created`.
    SignerCreated(SignerChange),
    /// `signer_removed`.
    SignerRemoved(SignerChange),
    /// `signer_updated`.
    SignerUpdated(SignerChange),
    /// `trustline_created`.
    TrustlineCreated(TrustlineChange),
    /// `trustline_removed`.
    TrustlineRemoved(TrustlineChange),
    /// `trustline_updated`.
    TrustlineUpdated(TrustlineChange),
    /// `trustline_authorized`.
    TrustlineAuthorized(TrustlineAuthorization),
    /// `trustline_deauthorized`.
    TrustlineDeauthorized(TrustlineAuthorization),
    /// `trustline_authorized_to_maintain_liabilities`.
    TrustlineAuthorizedToMaintainLiabilities(TrustlineAuthorization),
    /// `trustline_flags_updated`.
    TrustlineFlagsUpdated(TrustlineFlagsUpdated),
    /// `trade`.
    Trade(TradeEffect),
    /// `data_created`.
    DataCreated(DataEntry),
    /// `data_removed`.
    DataRemoved(DataRemoved),
    /// `data_updated`.
    DataUpdated(DataEntry),
    /// `sequence_bumped`.
    SequenceBumped(SequenceBumped),
    /// `claimable_balance_created`.
    ClaimableBalanceCreated(ClaimableBalanceEvent),
    /// `claimable_balance_claimant_created`.
    ClaimableBalanceClaimantCreated(ClaimableBalanceEvent),
    /// `claimable_balance_claimed`.
    ClaimableBalanceClaimed(ClaimableBalanceEvent),
    /// `account_sponsorship_created`.
    AccountSponsorshipCreated(SponsorshipCreated),
    /// `account_sponsorship_updated`.
    AccountSponsorshipUpdated(SponsorshipUpdated),
    /// `account_sponsorship_removed`.
    AccountSponsorshipRemoved(SponsorshipRemoved),
    /// `trustline_sponsorship_created`.
    TrustlineSponsorshipCreated(SponsorshipCreated),
    /// `trustline_sponsorship_updated`.
    TrustlineSponsorshipUpdated(SponsorshipUpdated),
    /// `trustline_sponsorship_removed`.
    TrustlineSponsorshipRemoved(SponsorshipRemoved),
    /// `data_sponsorship_created`.
    DataSponsorshipCreated(SponsorshipCreated),
    /// `data_sponsorship_updated`.
    DataSponsorshipUpdated(SponsorshipUpdated),
    /// `data_sponsorship_removed`.
    DataSponsorshipRemoved(SponsorshipRemoved),
    /// `claimable_balance_sponsorship_created`.
    ClaimableBalanceSponsorshipCreated(SponsorshipCreated),
    /// `claimable_balance_sponsorship_updated`.
    ClaimableBalanceSponsorshipUpdated(SponsorshipUpdated),
    /// `claimable_balance_sponsorship_removed`.
    ClaimableBalanceSponsorshipRemoved(SponsorshipRemoved),
    /// `signer_sponsorship_created`.
    SignerSponsorshipCreated(SponsorshipCreated),
    /// `signer_sponsorship_updated`.
    SignerSponsorshipUpdated(SponsorshipUpdated),
    /// `signer_sponsorship_removed`.
    SignerSponsorshipRemoved(SponsorshipRemoved),
    /// Unknown tag or undecodable details; the raw detail fields.
    Generic(Map<String, Value>),
}

// =============================================================================
// Dispatch Table
// =============================================================================

type Decoder = fn(&Value) -> Result<EffectKind, serde_json::Error>;

fn decode<T: DeserializeOwned>(details: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(details)
}

const EFFECT_TABLE: &[(&str, Decoder)] = &[
    ("account_created", |d| decode(d).map(EffectKind::AccountCreated)),
    ("account_credited", |d| decode(d).map(EffectKind::AccountCredited)),
    ("account_debited", |d| decode(d).map(EffectKind::AccountDebited)),
    ("account_thresholds_updated", |d| {
        decode(d).map(EffectKind::AccountThresholdsUpdated)
    }),
    ("account_home_domain_updated", |d| {
        decode(d).map(EffectKind::AccountHomeDomainUpdated)
    }),
    ("account_flags_updated", |d| {
        decode(d).map(EffectKind::AccountFlagsUpdated)
    }),
    ("signer_created", |d| decode(d).map(EffectKind::SignerCreated)),
    ("signer_removed", |d| decode(d).map(EffectKind::SignerRemoved)),
    ("signer_updated", |d| decode(d).map(EffectKind::SignerUpdated)),
    ("trustline_created", |d| decode(d).map(EffectKind::TrustlineCreated)),
    ("trustline_removed", |d| decode(d).map(EffectKind::TrustlineRemoved)),
    ("trustline_updated", |d| decode(d).map(EffectKind::TrustlineUpdated)),
    ("trustline_authorized", |d| {
        decode(d).map(EffectKind::TrustlineAuthorized)
    }),
    ("trustline_deauthorized", |d| {
        decode(d).map(EffectKind::TrustlineDeauthorized)
    }),
    ("trustline_authorized_to_maintain_liabilities", |d| {
        decode(d).map(EffectKind::TrustlineAuthorizedToMaintainLiabilities)
    }),
    ("trustline_flags_updated", |d| {
        decode(d).map(EffectKind::TrustlineFlagsUpdated)
    }),
    ("trade", |d| decode(d).map(EffectKind::Trade)),
    ("data_created", |d| decode(d).map(EffectKind::DataCreated)),
    ("data_removed", |d| decode(d).map(EffectKind::DataRemoved)),
    ("data_updated", |d| decode(d).map(EffectKind::DataUpdated)),
    ("sequence_bumped", |d| decode(d).map(EffectKind::SequenceBumped)),
    ("claimable_balance_created", |d| {
        decode(d).map(EffectKind::ClaimableBalanceCreated)
    }),
    ("claimable_balance_claimant_created", |d| {
        decode(d).map(EffectKind::ClaimableBalanceClaimantCreated)
    }),
    ("claimable_balance_claimed", |d| {
        decode(d).map(EffectKind::ClaimableBalanceClaimed)
    }),
    ("account_sponsorship_created", |d| {
        decode(d).map(EffectKind::AccountSponsorshipCreated)
    }),
    ("account_sponsorship_updated", |d| {
        decode(d).map(EffectKind::AccountSponsorshipUpdated)
    }),
    ("account_sponsorship_removed", |d| {
        decode(d).map(EffectKind::AccountSponsorshipRemoved)
    }),
    ("trustline_sponsorship_created", |d| {
        decode(d).map(EffectKind::TrustlineSponsorshipCreated)
    }),
    ("trustline_sponsorship_updated", |d| {
        decode(d).map(EffectKind::TrustlineSponsorshipUpdated)
    }),
    ("trustline_sponsorship_removed", |d| {
        decode(d).map(EffectKind::TrustlineSponsorshipRemoved)
    }),
    ("data_sponsorship_created", |d| {
        decode(d).map(EffectKind::DataSponsorshipCreated)
    }),
    ("data_sponsorship_updated", |d| {
        decode(d).map(EffectKind::DataSponsorshipUpdated)
    }),
    ("data_sponsorship_removed", |d| {
        decode(d).map(EffectKind::DataSponsorshipRemoved)
    }),
    ("claimable_balance_sponsorship_created", |d| {
        decode(d).map(EffectKind::ClaimableBalanceSponsorshipCreated)
    }),
    ("claimable_balance_sponsorship_updated", |d| {
        decode(d).map(EffectKind::ClaimableBalanceSponsorshipUpdated)
    }),
    ("claimable_balance_sponsorship_removed", |d| {
        decode(d).map(EffectKind::ClaimableBalanceSponsorshipRemoved)
    }),
    ("signer_sponsorship_created", |d| {
        decode(d).map(EffectKind::SignerSponsorshipCreated)
    }),
    ("signer_sponsorship_updated", |d| {
        decode(d).map(EffectKind::SignerSponsorshipUpdated)
    }),
    ("signer_sponsorship_removed", |d| {
        decode(d).map(EffectKind::SignerSponsorshipRemoved)
    }),
];

static EFFECT_DECODERS: LazyLock<HashMap<&'static str, Decoder>> =
    LazyLock::new(|| EFFECT_TABLE.iter().copied().collect());

/// Type tags with a dedicated effect variant.
pub fn effect_tags() -> impl Iterator<Item = &'static str> {
    EFFECT_TABLE.iter().map(|(tag, _)| *tag)
}

impl EffectKind {
    /// Decode the detail fields for `tag`, falling back to [`EffectKind::Generic`].
    #[must_use]
    pub fn dispatch(tag: &str, details: Map<String, Value>) -> Self {
        let Some(decoder) = EFFECT_DECODERS.get(tag) else {
            tracing::debug!(tag, "Unknown effect type, using generic effect");
            return Self::Generic(details);
        };

        let details = Value::Object(details);
        match decoder(&details) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(tag, error = %e, "Effect details did not decode, using generic effect");
                match details {
                    Value::Object(map) => Self::Generic(map),
                    _ => Self::Generic(Map::new()),
                }
            }
        }
    }

    /// Whether the tag was not recognised or did not decode.
    #[must_use]
    pub const fn is_generic(&self) -> bool {
        matches!(self, Self::Generic(_))
    }
}

// =============================================================================
// Effect Entity
// =============================================================================

/// A cached effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Effect {
    /// Effect id.
    pub id: String,
    /// Pagination cursor.
    pub paging_token: String,
    /// Type tag.
    pub type_name: String,
    /// Numeric type code.
    pub type_code: u32,
    /// Account the effect applies to.
    pub account: String,
    /// Time of the ledger that produced the effect.
    pub created_at: Option<DateTime<Utc>>,
    /// Tag-specific data.
    pub kind: EffectKind,
}

impl Effect {
    /// Build an effect from its raw record, dispatching on the type tag.
    #[must_use]
    pub fn from_record(raw: EffectRecord) -> Self {
        let kind = EffectKind::dispatch(&raw.type_name, raw.details);
        Self {
            id: raw.id,
            paging_token: raw.paging_token,
            type_name: raw.type_name,
            type_code: raw.type_i,
            account: raw.account,
            created_at: raw.created_at,
            kind,
        }
    }

    /// Id of the operation that produced this effect.
    #[must_use]
    pub fn operation_id(&self) -> String {
        operation_id_of(&self.id)
    }
}

/// Operation id part of an effect id, without zero padding.
#[must_use]
pub fn operation_id_of(effect_id: &str) -> String {
    let prefix = effect_id.split('-').next().unwrap_or(effect_id);
    let trimmed = prefix.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

impl CachedEntity for Effect {
    type Raw = EffectRecord;

    fn cache_key(raw: &EffectRecord) -> CacheKey {
        raw.id.clone()
    }

    fn build(raw: EffectRecord) -> Self {
        Self::from_record(raw)
    }

    fn patch(&mut self, raw: EffectRecord) -> Patch {
        *self = Self::from_record(raw);
        Patch::Applied
    }
}

// =============================================================================
// Tests
// =============================================================================
