//! Entity Managers
//!
//! An [`EntityManager`] pairs the cache of one record family with the
//! [`RecordSource`] used on a miss. [`Managers`] bundles one manager per
//! family, wired to the ledger and platform APIs.

use std::fmt;
use std::sync::Arc;

use crate::application::ports::{
    LedgerApi, ManagerError, PlatformApi, RecordSource, embedded_records,
};
use crate::application::services::record_sources::{
    LedgerRecord, LedgerSource, PaymentSource, decode_record,
};
use crate::domain::cache::{CachedEntity, Entity, EntityCache};
use crate::domain::records::{
    Account, Asset, ClaimableBalance, Effect, Ledger, Offer, Operation, PlatformPayment,
    RecordFamily, Trade, Transaction,
};
use crate::infrastructure::metrics;

/// Cache plus lookup for one record family.
pub struct EntityManager<V: CachedEntity> {
    family: RecordFamily,
    cache: EntityCache<V>,
    source: Arc<dyn RecordSource<V>>,
}

impl<V: CachedEntity> EntityManager<V> {
    /// Create a manager with an empty cache.
    #[must_use]
    pub fn new(family: RecordFamily, source: Arc<dyn RecordSource<V>>) -> Self {
        Self {
            family,
            cache: EntityCache::new(),
            source,
        }
    }

    /// Family managed.
    #[must_use]
    pub const fn family(&self) -> RecordFamily {
        self.family
    }

    /// Underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &EntityCache<V> {
        &self.cache
    }

    /// Insert or patch an entity from a raw payload.
    pub fn add(&self, raw: V::Raw, cache: bool) -> Entity<V> {
        let (entity, outcome) = self.cache.add_with_outcome(raw, cache);
        metrics::record_cache_write(self.family, outcome);
        entity
    }

    /// Look up a cached entity without touching the network.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<Entity<V>> {
        self.cache.resolve(key)
    }

    /// Get an entity, from the cache when allowed, else from the source.
    ///
    /// With `check_cache` set, a cached entity is returned without a lookup.
    /// A looked up record goes through [`EntityManager::add`] with `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when the source has no record, or
    /// the source's own error.
    pub async fn fetch(
        &self,
        key: &str,
        cache: bool,
        check_cache: bool,
    ) -> Result<Entity<V>, ManagerError> {
        if check_cache && let Some(entity) = self.cache.resolve(key) {
            return Ok(entity);
        }

        tracing::debug!(family = %self.family, key, "Fetching record");
        match self.source.lookup(key).await? {
            Some(raw) => Ok(self.add(raw, cache)),
            None => Err(ManagerError::NotFound {
                family: self.family,
                key: key.to_string(),
            }),
        }
    }
}

impl<V: LedgerRecord> EntityManager<V> {
    /// Create a manager looking records up on the ledger API.
    #[must_use]
    pub fn ledger(api: Arc<dyn LedgerApi>) -> Self {
        Self::new(V::FAMILY, Arc::new(LedgerSource::<V>::new(api)))
    }
}

impl<V: CachedEntity> fmt::Debug for EntityManager<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("family", &self.family)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// One manager per record family.
pub struct Managers {
    /// Ledger accounts.
    pub accounts: EntityManager<Account>,
    /// Issued assets.
    pub assets: EntityManager<Asset>,
    /// Claimable balances.
    pub claimable_balances: EntityManager<ClaimableBalance>,
    /// Effects.
    pub effects: EntityManager<Effect>,
    /// Closed ledgers.
    pub ledgers: EntityManager<Ledger>,
    /// Open offers.
    pub offers: EntityManager<Offer>,
    /// Operations, payments included.
    pub operations: EntityManager<Operation>,
    /// Trades.
    pub trades: EntityManager<Trade>,
    /// Transactions.
    pub transactions: EntityManager<Transaction>,
    /// Platform payments.
    pub payments: EntityManager<PlatformPayment>,
    ledger: Arc<dyn LedgerApi>,
}

impl Managers {
    /// Wire every manager to its API.
    #[must_use]
    pub fn new(ledger: &Arc<dyn LedgerApi>, platform: Arc<dyn PlatformApi>) -> Self {
        Self {
            accounts: EntityManager::ledger(Arc::clone(ledger)),
            assets: EntityManager::ledger(Arc::clone(ledger)),
            claimable_balances: EntityManager::ledger(Arc::clone(ledger)),
            effects: EntityManager::ledger(Arc::clone(ledger)),
            ledgers: EntityManager::ledger(Arc::clone(ledger)),
            offers: EntityManager::ledger(Arc::clone(ledger)),
            operations: EntityManager::ledger(Arc::clone(ledger)),
            trades: EntityManager::ledger(Arc::clone(ledger)),
            transactions: EntityManager::ledger(Arc::clone(ledger)),
            payments: EntityManager::new(
                RecordFamily::Payments,
                Arc::new(PaymentSource::new(platform)),
            ),
            ledger: Arc::clone(ledger),
        }
    }

    /// Ledger API the managers look records up on.
    #[must_use]
    pub fn ledger_api(&self) -> &Arc<dyn LedgerApi> {
        &self.ledger
    }

    /// Fetch and decode the records listed under a ledger API collection.
    ///
    /// Nothing is cached. A missing collection is empty.
    ///
    /// # Errors
    ///
    /// Returns the request error, or [`ManagerError::Decode`] for a record
    /// that does not decode.
    pub async fn records_under<V: LedgerRecord>(
        &self,
        path: &str,
    ) -> Result<Vec<V::Raw>, ManagerError> {
        let page = self.ledger.get(path, &[("limit", "200")]).await?;
        let Some(page) = page else {
            return Ok(Vec::new());
        };

        embedded_records(page)
            .into_iter()
            .map(decode_record::<V>)
            .collect()
    }

    /// Operations listed under a ledger API collection.
    ///
    /// Operations already cached are returned as cached; others are built
    /// without being stored.
    ///
    /// # Errors
    ///
    /// Same as [`Managers::records_under`].
    pub async fn operations_under(
        &self,
        path: &str,
    ) -> Result<Vec<Entity<Operation>>, ManagerError> {
        Ok(self
            .records_under::<Operation>(path)
            .await?
            .into_iter()
            .map(|raw| self.operations.add(raw, false))
            .collect())
    }
}

impl fmt::Debug for Managers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managers")
            .field("accounts", &self.accounts)
            .field("assets", &self.assets)
            .field("claimable_balances", &self.claimable_balances)
            .field("effects", &self.effects)
            .field("ledgers", &self.ledgers)
            .field("offers", &self.offers)
            .field("operations", &self.operations)
            .field("trades", &self.trades)
            .field("transactions", &self.transactions)
            .field("payments", &self.payments)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
