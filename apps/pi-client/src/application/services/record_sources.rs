//! Record Sources
//!
//! [`RecordSource`] implementations used by the entity managers on a cache
//! miss. Ledger families share one generic source driven by each family's
//! [`LookupRoute`]; platform payments go through the platform API.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::application::ports::{
    HttpMethod, LedgerApi, ManagerError, PlatformApi, RecordSource, embedded_records,
};
use crate::domain::cache::CachedEntity;
use crate::domain::records::{
    Account, Asset, AssetKey, ClaimableBalance, Effect, Ledger, Offer, Operation, PlatformPayment,
    RecordFamily, Trade, Transaction, operation_id_of,
};

// =============================================================================
// Lookup Routes
// =============================================================================

/// How one record is looked up on the ledger API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupRoute {
    /// GET a single record.
    Record {
        /// Path relative to the ledger base URL.
        path: String,
    },
    /// GET a collection page and pick one record from it.
    Search {
        /// Path relative to the ledger base URL.
        path: String,
        /// Query pairs.
        query: Vec<(String, String)>,
        /// Id of the record to pick, or the first record when absent.
        id: Option<String>,
    },
    /// The family has no lookup.
    Unsupported,
}

/// A ledger record family with a lookup route.
pub trait LedgerRecord: CachedEntity<Raw: DeserializeOwned> {
    /// Family label.
    const FAMILY: RecordFamily;

    /// Route for looking up `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidKey`] for malformed keys.
    fn route(key: &str) -> Result<LookupRoute, ManagerError>;
}

fn checked_key(family: RecordFamily, key: &str) -> Result<(), ManagerError> {
    if key.is_empty() || key.contains(['/', '?', '#']) {
        return Err(ManagerError::InvalidKey {
            family,
            key: key.to_string(),
        });
    }
    Ok(())
}

fn record_route(
    family: RecordFamily,
    prefix: &str,
    key: &str,
) -> Result<LookupRoute, ManagerError> {
    checked_key(family, key)?;
    Ok(LookupRoute::Record {
        path: format!("{prefix}/{key}"),
    })
}

impl LedgerRecord for Account {
    const FAMILY: RecordFamily = RecordFamily::Accounts;

    fn route(key: &str) -> Result<LookupRoute, ManagerError> {
        record_route(Self::FAMILY, "accounts", key)
    }
}

impl LedgerRecord for Asset {
    const FAMILY: RecordFamily = RecordFamily::Assets;

    fn route(key: &str) -> Result<LookupRoute, ManagerError> {
        if key == "native" {
            return Ok(LookupRoute::Unsupported);
        }
        let parsed = AssetKey::parse(key).ok_or_else(|| ManagerError::InvalidKey {
            family: Self::FAMILY,
            key: key.to_string(),
        })?;
        Ok(LookupRoute::Search {
            path: "assets".to_string(),
            query: vec![
                ("asset_code".to_string(), parsed.code),
                ("asset_issuer".to_string(), parsed.issuer),
            ],
            id: None,
        })
    }
}

impl LedgerRecord for ClaimableBalance {
    const FAMILY: RecordFamily = RecordFamily::ClaimableBalances;

    fn route(key: &str) -> Result<LookupRoute, ManagerError> {
        record_route(Self::FAMILY, "claimable_balances", key)
    }
}

impl LedgerRecord for Effect {
    const FAMILY: RecordFamily = RecordFamily::Effects;

    fn route(key: &str) -> Result<LookupRoute, ManagerError> {
        checked_key(Self::FAMILY, key)?;
        if !key.contains('-') {
            return Err(ManagerError::InvalidKey {
                family: Self::FAMILY,
                key: key.to_string(),
            });
        }
        Ok(LookupRoute::Search {
            path: format!("operations/{}/effects", operation_id_of(key)),
            query: vec![("limit".to_string(), "200".to_string())],
            id: Some(key.to_string()),
        })
    }
}

impl LedgerRecord for Ledger {
    const FAMILY: RecordFamily = RecordFamily::Ledgers;

    fn route(key: &str) -> Result<LookupRoute, ManagerError> {
        if key.parse::<u64>().is_err() {
            return Err(ManagerError::InvalidKey {
                family: Self::FAMILY,
                key: key.to_string(),
            });
        }
        record_route(Self::FAMILY, "ledgers", key)
    }
}

impl LedgerRecord for Offer {
    const FAMILY: RecordFamily = RecordFamily::Offers;

    fn route(key: &str) -> Result<LookupRoute, ManagerError> {
        record_route(Self::FAMILY, "offers", key)
    }
}

impl LedgerRecord for Operation {
    const FAMILY: RecordFamily = RecordFamily::Operations;

    fn route(key: &str) -> Result<LookupRoute, ManagerError> {
        record_route(Self::FAMILY, "operations", key)
    }
}

impl LedgerRecord for Trade {
    const FAMILY: RecordFamily = RecordFamily::Trades;

    fn route(_key: &str) -> Result<LookupRoute, ManagerError> {
        Ok(LookupRoute::Unsupported)
    }
}

impl LedgerRecord for Transaction {
    const FAMILY: RecordFamily = RecordFamily::Transactions;

    fn route(key: &str) -> Result<LookupRoute, ManagerError> {
        record_route(Self::FAMILY, "transactions", key)
    }
}

// =============================================================================
// Ledger Source
// =============================================================================

/// Looks up ledger records of family `V`.
pub struct LedgerSource<V> {
    api: Arc<dyn LedgerApi>,
    _family: PhantomData<fn() -> V>,
}

impl<V> LedgerSource<V> {
    /// Create a source over a ledger API.
    #[must_use]
    pub fn new(api: Arc<dyn LedgerApi>) -> Self {
        Self {
            api,
            _family: PhantomData,
        }
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Decode a raw JSON record for family `V`.
///
/// # Errors
///
/// Returns [`ManagerError::Decode`] when the JSON does not fit the record.
pub fn decode_record<V: LedgerRecord>(value: Value) -> Result<V::Raw, ManagerError> {
    serde_json::from_value(value).map_err(|e| ManagerError::Decode {
        family: V::FAMILY,
        message: e.to_string(),
    })
}

#[async_trait]
impl<V: LedgerRecord> RecordSource<V> for LedgerSource<V> {
    async fn lookup(&self, key: &str) -> Result<Option<V::Raw>, ManagerError> {
        let record = match V::route(key)? {
            LookupRoute::Unsupported => {
                return Err(ManagerError::Unsupported { family: V::FAMILY });
            }
            LookupRoute::Record { path } => self.api.get(&path, &[]).await?,
            LookupRoute::Search { path, query, id } => {
                let query: Vec<(&str, &str)> = query
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                let page = self.api.get(&path, &query).await?;
                page.and_then(|page| {
                    embedded_records(page)
                        .into_iter()
                        .find(|r| id.as_deref().is_none_or(|id| record_id(r) == Some(id)))
                })
            }
        };

        record.map(decode_record::<V>).transpose()
    }
}

// =============================================================================
// Platform Payment Source
// =============================================================================

/// Looks up platform payments by identifier.
pub struct PaymentSource {
    api: Arc<dyn PlatformApi>,
}

impl PaymentSource {
    /// Create a source over a platform API.
    #[must_use]
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RecordSource<PlatformPayment> for PaymentSource {
    async fn lookup(&self, key: &str) -> Result<Option<PlatformPayment>, ManagerError> {
        checked_key(RecordFamily::Payments, key)?;
        let route = format!("v2/payments/{key}");
        let body = match self.api.call(HttpMethod::Get, &route, None).await {
            Ok(body) => body,
            Err(e) if e.status() == Some(404) => None,
            Err(e) => return Err(e.into()),
        };

        body.map(|value| {
            serde_json::from_value(value).map_err(|e| ManagerError::Decode {
                family: RecordFamily::Payments,
                message: e.to_string(),
            })
        })
        .transpose()
    }
}

// =============================================================================
// Tests
// =============================================================================
