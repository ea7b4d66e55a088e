//! Ledger Operations
//!
//! Operations are tagged by `type` like effects are, and are built the same
//! way: [`OperationRecord`] carries base fields and the untyped detail map,
//! [`Operation::from_record`] selects the [`OperationKind`] through a static
//! table and degrades to [`OperationKind::Generic`].

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AssetDescriptor, Claimant, PriceRatio};
use crate::domain::cache::{CacheKey, CachedEntity, Patch};

// =============================================================================
// Raw Record
// =============================================================================

/// Raw operation payload as delivered by Horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Operation id.
    #[serde(deserialize_with = "super::id_string")]
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
    /// Hash of the enclosing transaction.
    #[serde(default)]
    pub transaction_hash: String,
    /// Source account.
    #[serde(default)]
    pub source_account: String,
    /// Ledger close time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Whether the enclosing transaction succeeded.
    #[serde(default)]
    pub transaction_successful: Option<bool>,
    /// Tag-specific fields.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

// =============================================================================
// Operation Variants
// =============================================================================

/// `create_account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccount {
    /// Created account.
    pub account: String,
    /// Funding account.
    pub funder: String,
    /// Initial balance.
    pub starting_balance: Decimal,
}

/// `payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Sender.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Amount sent.
    pub amount: Decimal,
    /// Asset sent.
    #[serde(flatten)]
    pub asset: AssetDescriptor,
}

/// `path_payment_strict_receive` and `path_payment_strict_send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPayment {
    /// Sender.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Amount received.
    pub amount: Decimal,
    /// Asset received.
    #[serde(flatten)]
    pub asset: AssetDescriptor,
    /// Amount sent.
    #[serde(default)]
    pub source_amount: Option<Decimal>,
    /// Maximum amount sent (strict receive).
    #[serde(default)]
    pub source_max: Option<Decimal>,
    /// Minimum amount received (strict send).
    #[serde(default)]
    pub destination_min: Option<Decimal>,
    /// Sent asset type.
    #[serde(default)]
    pub source_asset_type: Option<String>,
    /// Sent asset code.
    #[serde(default)]
    pub source_asset_code: Option<String>,
    /// Sent asset issuer.
    #[serde(default)]
    pub source_asset_issuer: Option<String>,
    /// Intermediate assets.
    #[serde(default)]
    pub path: Vec<AssetDescriptor>,
}

impl PathPayment {
    /// Asset sent.
    #[must_use]
    pub fn source_asset(&self) -> AssetDescriptor {
        AssetDescriptor::from_parts(
            self.source_asset_type.clone(),
            self.source_asset_code.clone(),
            self.source_asset_issuer.clone(),
        )
    }
}

/// `manage_sell_offer`, `manage_buy_offer` and `create_passive_sell_offer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageOffer {
    /// Offer id (zero when the operation created the offer).
    #[serde(default, deserialize_with = "super::opt_id_string")]
    pub offer_id: Option<String>,
    /// Amount.
    pub amount: Decimal,
    /// Price as a decimal.
    pub price: Decimal,
    /// Price as a ratio.
    #[serde(default)]
    pub price_r: PriceRatio,
    /// Bought asset type.
    #[serde(default)]
    pub buying_asset_type: Option<String>,
    /// Bought asset code.
    #[serde(default)]
    pub buying_asset_code: Option<String>,
    /// Bought asset issuer.
    #[serde(default)]
    pub buying_asset_issuer: Option<String>,
    /// Sold asset type.
    #[serde(default)]
    pub selling_asset_type: Option<String>,
    /// Sold asset code.
    #[serde(default)]
    pub selling_asset_code: Option<String>,
    /// Sold asset issuer.
    #[serde(default)]
    pub selling_asset_issuer: Option<String>,
}

impl ManageOffer {
    /// Asset bought.
    #[must_use]
    pub fn buying_asset(&self) -> AssetDescriptor {
        AssetDescriptor::from_parts(
            self.buying_asset_type.clone(),
            self.buying_asset_code.clone(),
            self.buying_asset_issuer.clone(),
        )
    }

    /// Asset sold.
    #[must_use]
    pub fn selling_asset(&self) -> AssetDescriptor {
        AssetDescriptor::from_parts(
            self.selling_asset_type.clone(),
            self.selling_asset_code.clone(),
            self.selling_asset_issuer.clone(),
        )
    }
}

/// `set_options`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOptions {
    /// Signer added, updated or removed.
    #[serde(default)]
    pub signer_key: Option<String>,
    /// Weight given to `signer_key`.
    #[serde(default)]
    pub signer_weight: Option<u32>,
    /// New master key weight.
    #[serde(default)]
    pub master_key_weight: Option<u32>,
    /// New low threshold.
    #[serde(default)]
    pub low_threshold: Option<u8>,
    /// New medium threshold.
    #[serde(default)]
    pub med_threshold: Option<u8>,
    /// New high threshold.
    #[serde(default)]
    pub high_threshold: Option<u8>,
    /// New home domain.
    #[serde(default)]
    pub home_domain: Option<String>,
    /// Flags set, numeric.
    #[serde(default)]
    pub set_flags: Vec<u32>,
    /// Flags set, by name.
    #[serde(default)]
    pub set_flags_s: Vec<String>,
    /// Flags cleared, numeric.
    #[serde(default)]
    pub clear_flags: Vec<u32>,
    /// Flags cleared, by name.
    #[serde(default)]
    pub clear_flags_s: Vec<String>,
}

/// `change_trust`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTrust {
    /// Trusted asset.
    #[serde(flatten)]
    pub asset: AssetDescriptor,
    /// New limit.
    #[serde(default)]
    pub limit: Option<Decimal>,
    /// Asset issuer.
    #[serde(default)]
    pub trustee: Option<String>,
    /// Account changing its trustline.
    #[serde(default)]
    pub trustor: String,
}

/// `allow_trust`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowTrust {
    /// Asset concerned.
    #[serde(flatten)]
    pub asset: AssetDescriptor,
    /// Asset issuer.
    pub trustee: String,
    /// Trustline holder.
    pub trustor: String,
    /// Full authorization granted.
    #[serde(default)]
    pub authorize: bool,
    /// Authorization to maintain liabilities granted.
    #[serde(default)]
    pub authorize_to_maintain_liabilities: bool,
}

/// `account_merge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMerge {
    /// Merged account.
    #[serde(default)]
    pub account: String,
    /// Account receiving the balance.
    pub into: String,
}

/// `manage_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageData {
    /// Entry name.
    pub name: String,
    /// Base64 value, absent when the entry is deleted.
    #[serde(default)]
    pub value: Option<String>,
}

/// `bump_sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BumpSequence {
    /// Target sequence.
    #[serde(deserialize_with = "super::id_string")]
    pub bump_to: String,
}

/// `create_claimable_balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClaimableBalance {
    /// Canonical asset string.
    pub asset: String,
    /// Amount locked.
    pub amount: Decimal,
    /// Sponsor of the balance.
    #[serde(default)]
    pub sponsor: Option<String>,
    /// Accounts allowed to claim.
    #[serde(default)]
    pub claimants: Vec<Claimant>,
}

/// `claim_claimable_balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimClaimableBalance {
    /// Balance claimed.
    pub balance_id: String,
    /// Claiming account.
    pub claimant: String,
}

/// `begin_sponsoring_future_reserves`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginSponsoringFutureReserves {
    /// Account whose reserves get sponsored.
    pub sponsored_id: String,
}

/// `end_sponsoring_future_reserves`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndSponsoringFutureReserves {
    /// Sponsor that began the sponsorship.
    #[serde(default)]
    pub begin_sponsor: Option<String>,
}

/// `revoke_sponsorship`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeSponsorship {
    /// Sponsored account.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Sponsored claimable balance.
    #[serde(default)]
    pub claimable_balance_id: Option<String>,
    /// Owner of the sponsored data entry.
    #[serde(default)]
    pub data_account_id: Option<String>,
    /// Sponsored data entry.
    #[serde(default)]
    pub data_name: Option<String>,
    /// Sponsored offer.
    #[serde(default, deserialize_with = "super::opt_id_string")]
    pub offer_id: Option<String>,
    /// Owner of the sponsored trustline.
    #[serde(default)]
    pub trustline_account_id: Option<String>,
    /// Asset of the sponsored trustline.
    #[serde(default)]
    pub trustline_asset: Option<String>,
    /// Owner of the sponsored signer.
    #[serde(default)]
    pub signer_account_id: Option<String>,
    /// Sponsored signer.
    #[serde(default)]
    pub signer_key: Option<String>,
}

/// Concrete operation, selected by type tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OperationKind {
    /// `create_account`.
    CreateAccount(CreateAccount),
    /// `payment`.
    Payment(Payment),
    /// `path_payment_strict_receive`.
    PathPaymentStrictReceive(PathPayment),
    /// `path_payment_strict_send`.
    PathPaymentStrictSend(PathPayment),
    /// `manage_sell_offer`.
    ManageSellOffer(ManageOffer),
    /// `manage_buy_offer`.
    ManageBuyOffer(ManageOffer),
    /// `create_passive_sell_offer`.
    CreatePassiveSellOffer(ManageOffer),
    /// `set_options`.
    SetOptions(SetOptions),
    /// `change_trust`.
    ChangeTrust(ChangeTrust),
    /// `allow_trust`.
    AllowTrust(AllowTrust),
    /// `account_merge`.
    AccountMerge(AccountMerge),
    /// `manage_data`.
    ManageData(ManageData),
    /// `bump_sequence`.
    BumpSequence(BumpSequence),
    /// `create_claimable_balance`.
    CreateClaimableBalance(CreateClaimableBalance),
    /// `claim_claimable_balance`.
    ClaimClaimableBalance(ClaimClaimableBalance),
    /// `begin_sponsoring_future_reserves`.
    BeginSponsoringFutureReserves(BeginSponsoringFutureReserves),
    /// `end_sponsoring_future_reserves`.
    EndSponsoringFutureReserves(EndSponsoringFutureReserves),
    /// `revoke_sponsorship`.
    RevokeSponsorship(RevokeSponsorship),
    /// Unknown tag or undecodable details; the raw detail fields.
    Generic(Map<String, Value>),
}

// =============================================================================
// Dispatch Table
// =============================================================================

type Decoder = fn(&Value) -> Result<OperationKind, serde_json::Error>;

fn decode<T: DeserializeOwned>(details: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(details)
}

const OPERATION_TABLE: &[(&str, Decoder)] = &[
    ("create_account", |d| decode(d).map(OperationKind::CreateAccount)),
    ("payment", |d| decode(d).map(OperationKind::Payment)),
    ("path_payment_strict_receive", |d| {
        decode(d).map(OperationKind::PathPaymentStrictReceive)
    }),
    ("path_payment_strict_send", |d| {
        decode(d).map(OperationKind::PathPaymentStrictSend)
    }),
    ("manage_sell_offer", |d| decode(d).map(OperationKind::ManageSellOffer)),
    ("manage_buy_offer", |d| decode(d).map(OperationKind::ManageBuyOffer)),
    ("create_passive_sell_offer", |d| {
        decode(d).map(OperationKind::CreatePassiveSellOffer)
    }),
    ("set_options", |d| decode(d).map(OperationKind::SetOptions)),
    ("change_trust", |d| decode(d).map(OperationKind::ChangeTrust)),
    ("allow_trust", |d| decode(d).map(OperationKind::AllowTrust)),
    ("account_merge", |d| decode(d).map(OperationKind::AccountMerge)),
    ("manage_data", |d| decode(d).map(OperationKind::ManageData)),
    ("bump_sequence", |d| decode(d).map(OperationKind::BumpSequence)),
    ("create_claimable_balance", |d| {
        decode(d).map(OperationKind::CreateClaimableBalance)
    }),
    ("claim_claimable_balance", |d| {
        decode(d).map(OperationKind::ClaimClaimableBalance)
    }),
    ("begin_sponsoring_future_reserves", |d| {
        decode(d).map(OperationKind::BeginSponsoringFutureReserves)
    }),
    ("end_sponsoring_future_reserves", |d| {
        decode(d).map(OperationKind::EndSponsoringFutureReserves)
    }),
    ("revoke_sponsorship", |d| {
        decode(d).map(OperationKind::RevokeSponsorship)
    }),
];

static OPERATION_DECODERS: LazyLock<HashMap<&'static str, Decoder>> =
    LazyLock::new(|| OPERATION_TABLE.iter().copied().collect());

/// Type tags with a dedicated operation variant.
pub fn operation_tags() -> impl Iterator<Item = &'static str> {
    OPERATION_TABLE.iter().map(|(tag, _)| *tag)
}

impl OperationKind {
    /// Decode the detail fields for `tag`, falling back to [`OperationKind::Generic`].
    #[must_use]
    pub fn dispatch(tag: &str, details: Map<String, Value>) -> Self {
        let Some(decoder) = OPERATION_DECODERS.get(tag) else {
            tracing::debug!(tag, "Unknown operation type, using generic operation");
            return Self::Generic(details);
        };

        let details = Value::Object(details);
        match decoder(&details) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(tag, error = %e, "Operation details did not decode, using generic operation");
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

    /// Whether this is a payment-like operation (plain or path payment).
    #[must_use]
    pub const fn is_payment(&self) -> bool {
        matches!(
            self,
            Self::Payment(_) | Self::PathPaymentStrictReceive(_) | Self::PathPaymentStrictSend(_)
        )
    }
}

// =============================================================================
// Operation Entity
// =============================================================================

/// A cached operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    /// Operation id.
    pub id: String,
    /// Pagination cursor.
    pub paging_token: String,
    /// Type tag.
    pub type_name: String,
    /// Numeric type code.
    pub type_code: u32,
    /// Hash of the enclosing transaction.
    pub transaction_hash: String,
    /// Source account.
    pub source_account: String,
    /// Ledger close time.
    pub created_at: Option<DateTime<Utc>>,
    /// Whether the enclosing transaction succeeded.
    pub transaction_successful: Option<bool>,
    /// Tag-specific data.
    pub kind: OperationKind,
}

impl Operation {
    /// Build an operation from its raw record, dispatching on the type tag.
    #[must_use]
    pub fn from_record(raw: OperationRecord) -> Self {
        let kind = OperationKind::dispatch(&raw.type_name, raw.details);
        Self {
            id: raw.id,
            paging_token: raw.paging_token,
            type_name: raw.type_name,
            type_code: raw.type_i,
            transaction_hash: raw.transaction_hash,
            source_account: raw.source_account,
            created_at: raw.created_at,
            transaction_successful: raw.transaction_successful,
            kind,
        }
    }
}

impl CachedEntity for Operation {
    type Raw = OperationRecord;

    fn cache_key(raw: &OperationRecord) -> CacheKey {
        raw.id.clone()
    }

    fn build(raw: OperationRecord) -> Self {
        Self::from_record(raw)
    }

    fn patch(&mut self, raw: OperationRecord) -> Patch {
        *self = Self::from_record(raw);
        Patch::Applied
    }
}

// =============================================================================
// Tests
// =============================================================================
