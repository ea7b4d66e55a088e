//! Related Records
//!
//! Collections listed under another record: the operations of a ledger, the
//! effects of an operation, everything scoped to an account. A collection is
//! read as one page. With an identity configured, records that do not
//! concern it are skipped before they reach a cache; the kept ones are added
//! and returned.

use crate::application::ports::ManagerError;
use crate::application::services::entity_manager::{EntityManager, Managers};
use crate::application::services::record_sources::LedgerRecord;
use crate::application::services::relevance::{trade_is_relevant, transaction_is_relevant};
use crate::domain::cache::{CachedEntity, Entity};
use crate::domain::records::{Effect, Offer, Operation, Trade, Transaction};
use crate::domain::relevance::{effect_is_relevant, offer_is_relevant, operation_is_relevant};
use crate::infrastructure::metrics;

/// Record a collection is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner<'a> {
    /// An account, by id.
    Account(&'a str),
    /// A closed ledger, by sequence.
    Ledger(u64),
    /// A transaction, by hash.
    Transaction(&'a str),
    /// An operation, by id.
    Operation(&'a str),
}

impl Owner<'_> {
    /// Ledger API path of `collection` under this owner.
    #[must_use]
    pub fn path(&self, collection: &str) -> String {
        match self {
            Self::Account(id) => format!("accounts/{id}/{collection}"),
            Self::Ledger(sequence) => format!("ledgers/{sequence}/{collection}"),
            Self::Transaction(hash) => format!("transactions/{hash}/{collection}"),
            Self::Operation(id) => format!("operations/{id}/{collection}"),
        }
    }
}

async fn keep_matching<V>(
    managers: &Managers,
    manager: &EntityManager<V>,
    path: &str,
    identity: Option<&str>,
    rule: fn(&V, &str) -> bool,
) -> Result<Vec<Entity<V>>, ManagerError>
where
    V: LedgerRecord,
    V::Raw: Clone,
{
    let records = managers.records_under::<V>(path).await?;
    let total = records.len();

    let kept: Vec<Entity<V>> = records
        .into_iter()
        .filter(|raw| identity.is_none_or(|id| rule(&V::build(raw.clone()), id)))
        .map(|raw| manager.add(raw, true))
        .collect();

    log_skipped(manager, path, total, kept.len());
    Ok(kept)
}

fn log_skipped<V: CachedEntity>(
    manager: &EntityManager<V>,
    path: &str,
    total: usize,
    kept: usize,
) {
    if kept < total {
        tracing::debug!(path, skipped = total - kept, "Skipped unrelated records");
        metrics::record_collection_filtered(manager.family(), total - kept);
    }
}

/// Operations listed under `owner`.
///
/// # Errors
///
/// Returns the request or decode error.
pub async fn operations(
    managers: &Managers,
    owner: Owner<'_>,
    identity: Option<&str>,
) -> Result<Vec<Entity<Operation>>, ManagerError> {
    let path = owner.path("operations");
    keep_matching(managers, &managers.operations, &path, identity, operation_is_relevant).await
}

/// Payment operations listed under `owner`.
///
/// # Errors
///
/// Returns the request or decode error.
pub async fn payments(
    managers: &Managers,
    owner: Owner<'_>,
    identity: Option<&str>,
) -> Result<Vec<Entity<Operation>>, ManagerError> {
    let path = owner.path("payments");
    keep_matching(managers, &managers.operations, &path, identity, operation_is_relevant).await
}

/// Effects listed under `owner`.
///
/// # Errors
///
/// Returns the request or decode error.
pub async fn effects(
    managers: &Managers,
    owner: Owner<'_>,
    identity: Option<&str>,
) -> Result<Vec<Entity<Effect>>, ManagerError> {
    let path = owner.path("effects");
    keep_matching(managers, &managers.effects, &path, identity, effect_is_relevant).await
}

/// Offers listed under `owner`.
///
/// # Errors
///
/// Returns the request or decode error.
pub async fn offers(
    managers: &Managers,
    owner: Owner<'_>,
    identity: Option<&str>,
) -> Result<Vec<Entity<Offer>>, ManagerError> {
    let path = owner.path("offers");
    keep_matching(managers, &managers.offers, &path, identity, offer_is_relevant).await
}

/// Transactions listed under `owner`. Relevance is decided by each
/// transaction's operations.
///
/// # Errors
///
/// Returns the request, decode or relevance lookup error.
pub async fn transactions(
    managers: &Managers,
    owner: Owner<'_>,
    identity: Option<&str>,
) -> Result<Vec<Entity<Transaction>>, ManagerError> {
    let path = owner.path("transactions");
    let records = managers.records_under::<Transaction>(&path).await?;
    let total = records.len();

    let mut kept = Vec::with_capacity(total);
    for raw in records {
        if let Some(id) = identity
            && !transaction_is_relevant(managers, &raw.hash, id).await?
        {
            continue;
        }
        kept.push(managers.transactions.add(raw, true));
    }

    log_skipped(&managers.transactions, &path, total, kept.len());
    Ok(kept)
}

/// Trades listed under `owner`. Relevance is decided by the operation that
/// produced each trade.
///
/// # Errors
///
/// Returns the request, decode or relevance lookup error.
pub async fn trades(
    managers: &Managers,
    owner: Owner<'_>,
    identity: Option<&str>,
) -> Result<Vec<Entity<Trade>>, ManagerError> {
    let path = owner.path("trades");
    let records = managers.records_under::<Trade>(&path).await?;
    let total = records.len();

    let mut kept = Vec::with_capacity(total);
    for raw in records {
        if let Some(id) = identity
            && !trade_is_relevant(managers, &raw, id, false).await?
        {
            continue;
        }
        kept.push(managers.trades.add(raw, true));
    }

    log_skipped(&managers.trades, &path, total, kept.len());
    Ok(kept)
}
