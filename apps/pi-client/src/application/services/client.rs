//! Client Facade
//!
//! [`PiClient`] wires the entity managers, the stream subscriptions, the event
//! hub and the payment service over one set of API adapters. It also exposes
//! the cross-record lookups and the collections listed under a record: every
//! `force_update` flag below bypasses the cache for that lookup only.

use std::sync::Arc;

use futures_util::future::try_join_all;

use crate::application::ports::{LedgerApi, ManagerError, PlatformApi, PushConnector};
use crate::application::services::collections::{self, Owner};
use crate::application::services::entity_manager::Managers;
use crate::application::services::payments::PaymentService;
use crate::application::services::relevance;
use crate::application::services::streams::{StreamContext, SubscriptionGroup};
use crate::domain::cache::Entity;
use crate::domain::records::{
    Account, Asset, Effect, Ledger, Offer, Operation, PlatformPayment, RecordFamily, Trade,
    Transaction,
};
use crate::domain::subscription::{StreamCategory, StreamTarget};
use crate::infrastructure::broadcast::EventHub;
use crate::infrastructure::config::ClientConfig;

/// Signer type backed by an account key.
const ED25519_SIGNER: &str = "ed25519_public_key";

/// Pi Network client.
#[derive(Debug)]
pub struct PiClient {
    identity: Option<String>,
    subscribed: Vec<StreamCategory>,
    managers: Arc<Managers>,
    events: Arc<EventHub>,
    streams: SubscriptionGroup,
    payments: PaymentService,
}

impl PiClient {
    /// Build a client over the given adapters. No feed is opened until
    /// [`PiClient::start`].
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        platform: Arc<dyn PlatformApi>,
        ledger: Arc<dyn LedgerApi>,
        connector: Arc<dyn PushConnector>,
    ) -> Self {
        let managers = Arc::new(Managers::new(&ledger, Arc::clone(&platform)));
        let events = Arc::new(EventHub::new(config.events.capacity));
        let context = Arc::new(StreamContext {
            identity: config.identity.clone(),
            managers: Arc::clone(&managers),
            events: Arc::clone(&events),
        });

        Self {
            identity: config.identity.clone(),
            subscribed: config.subscribed_categories.clone(),
            streams: SubscriptionGroup::new(&context, &connector),
            payments: PaymentService::new(platform, Arc::clone(&managers)),
            managers,
            events,
        }
    }

    /// Emit `ready` and listen to the configured categories.
    ///
    /// Returns how many feeds were opened.
    pub fn start(&self) -> usize {
        self.events.send_ready();
        let opened = self
            .subscribed
            .iter()
            .filter(|category| self.streams.get(**category).listen())
            .count();
        tracing::info!(
            identity = self.identity.as_deref().unwrap_or("-"),
            opened,
            "Client ready"
        );
        opened
    }

    /// Close every open feed. Returns how many were closed.
    pub fn stop_all(&self) -> usize {
        self.streams.stop(StreamTarget::All)
    }

    /// Account records are filtered for, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Event channels.
    #[must_use]
    pub const fn events(&self) -> &Arc<EventHub> {
        &self.events
    }

    /// Feed subscriptions.
    #[must_use]
    pub const fn streams(&self) -> &SubscriptionGroup {
        &self.streams
    }

    /// Entity managers.
    #[must_use]
    pub const fn managers(&self) -> &Arc<Managers> {
        &self.managers
    }

    /// Platform payments.
    #[must_use]
    pub const fn payments(&self) -> &PaymentService {
        &self.payments
    }

    // =========================================================================
    // Cross-Record Lookups
    // =========================================================================

    /// Transaction that contains `operation`.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn operation_transaction(
        &self,
        operation: &Operation,
        force_update: bool,
    ) -> Result<Entity<Transaction>, ManagerError> {
        self.managers
            .transactions
            .fetch(&operation.transaction_hash, true, !force_update)
            .await
    }

    /// Ledger that closed `transaction`.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn transaction_ledger(
        &self,
        transaction: &Transaction,
        force_update: bool,
    ) -> Result<Entity<Ledger>, ManagerError> {
        self.managers
            .ledgers
            .fetch(&transaction.ledger.to_string(), true, !force_update)
            .await
    }

    /// Operation that produced `effect`.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn effect_operation(
        &self,
        effect: &Effect,
        force_update: bool,
    ) -> Result<Entity<Operation>, ManagerError> {
        self.managers
            .operations
            .fetch(&effect.operation_id(), true, !force_update)
            .await
    }

    /// Account `effect` applies to.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn account_of_effect(
        &self,
        effect: &Effect,
        force_update: bool,
    ) -> Result<Entity<Account>, ManagerError> {
        self.managers
            .accounts
            .fetch(&effect.account, true, !force_update)
            .await
    }

    /// Memo of `transaction`.
    ///
    /// Payments made through the platform carry the payment identifier as
    /// the on-ledger memo; when that payment is cached its own memo is
    /// returned instead.
    #[must_use]
    pub fn transaction_memo(&self, transaction: &Transaction) -> Option<String> {
        let memo = transaction.memo.as_deref().filter(|m| !m.is_empty())?;
        match self.managers.payments.resolve(memo) {
            Some(payment) => Some(payment.read().memo.clone()),
            None => Some(memo.to_string()),
        }
    }

    /// Platform payment `transaction` settles.
    ///
    /// Only a memo naming an already cached payment resolves; any other memo
    /// yields `None` without a platform call. With `force_update` the cached
    /// payment is refreshed first.
    ///
    /// # Errors
    ///
    /// Returns the refresh error.
    pub async fn transaction_payment(
        &self,
        transaction: &Transaction,
        force_update: bool,
    ) -> Result<Option<Entity<PlatformPayment>>, ManagerError> {
        let Some(memo) = transaction.memo.as_deref().filter(|m| !m.is_empty()) else {
            return Ok(None);
        };
        if self.managers.payments.resolve(memo).is_none() {
            return Ok(None);
        }
        self.managers
            .payments
            .fetch(memo, true, !force_update)
            .await
            .map(Some)
    }

    /// Source account of `transaction`.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn transaction_source_account(
        &self,
        transaction: &Transaction,
        force_update: bool,
    ) -> Result<Entity<Account>, ManagerError> {
        self.managers
            .accounts
            .fetch(&transaction.source_account, true, !force_update)
            .await
    }

    /// Source account of `operation`.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn operation_source_account(
        &self,
        operation: &Operation,
        force_update: bool,
    ) -> Result<Entity<Account>, ManagerError> {
        self.managers
            .accounts
            .fetch(&operation.source_account, true, !force_update)
            .await
    }

    // =========================================================================
    // Related Collections
    // =========================================================================
    //
    // With an identity set, records that do not concern it are skipped and
    // not cached.

    /// Transactions of ledger `sequence`.
    ///
    /// # Errors
    ///
    /// Returns the request, decode or relevance lookup error.
    pub async fn ledger_transactions(
        &self,
        sequence: u64,
    ) -> Result<Vec<Entity<Transaction>>, ManagerError> {
        collections::transactions(&self.managers, Owner::Ledger(sequence), self.identity()).await
    }

    /// Operations of ledger `sequence`.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn ledger_operations(
        &self,
        sequence: u64,
    ) -> Result<Vec<Entity<Operation>>, ManagerError> {
        collections::operations(&self.managers, Owner::Ledger(sequence), self.identity()).await
    }

    /// Effects of ledger `sequence`.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn ledger_effects(&self, sequence: u64) -> Result<Vec<Entity<Effect>>, ManagerError> {
        collections::effects(&self.managers, Owner::Ledger(sequence), self.identity()).await
    }

    /// Operations of transaction `hash`.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn transaction_operations(
        &self,
        hash: &str,
    ) -> Result<Vec<Entity<Operation>>, ManagerError> {
        collections::operations(&self.managers, Owner::Transaction(hash), self.identity()).await
    }

    /// Effects of transaction `hash`.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn transaction_effects(
        &self,
        hash: &str,
    ) -> Result<Vec<Entity<Effect>>, ManagerError> {
        collections::effects(&self.managers, Owner::Transaction(hash), self.identity()).await
    }

    /// Effects of operation `id`.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn operation_effects(&self, id: &str) -> Result<Vec<Entity<Effect>>, ManagerError> {
        collections::effects(&self.managers, Owner::Operation(id), self.identity()).await
    }

    // =========================================================================
    // Account Accessors
    // =========================================================================

    /// Operations of account `account_id`.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn account_operations(
        &self,
        account_id: &str,
    ) -> Result<Vec<Entity<Operation>>, ManagerError> {
        collections::operations(&self.managers, Owner::Account(account_id), self.identity()).await
    }

    /// Payment operations of account `account_id`.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn account_payments(
        &self,
        account_id: &str,
    ) -> Result<Vec<Entity<Operation>>, ManagerError> {
        collections::payments(&self.managers, Owner::Account(account_id), self.identity()).await
    }

    /// Offers of account `account_id`.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn account_offers(
        &self,
        account_id: &str,
    ) -> Result<Vec<Entity<Offer>>, ManagerError> {
        collections::offers(&self.managers, Owner::Account(account_id), self.identity()).await
    }

    /// Trades of account `account_id`.
    ///
    /// # Errors
    ///
    /// Returns the request, decode or relevance lookup error.
    pub async fn account_trades(
        &self,
        account_id: &str,
    ) -> Result<Vec<Entity<Trade>>, ManagerError> {
        collections::trades(&self.managers, Owner::Account(account_id), self.identity()).await
    }

    /// Transactions of account `account_id`.
    ///
    /// # Errors
    ///
    /// Returns the request, decode or relevance lookup error.
    pub async fn account_transactions(
        &self,
        account_id: &str,
    ) -> Result<Vec<Entity<Transaction>>, ManagerError> {
        collections::transactions(&self.managers, Owner::Account(account_id), self.identity())
            .await
    }

    /// Effects of account `account_id`.
    ///
    /// # Errors
    ///
    /// Returns the request or decode error.
    pub async fn account_effects(
        &self,
        account_id: &str,
    ) -> Result<Vec<Entity<Effect>>, ManagerError> {
        collections::effects(&self.managers, Owner::Account(account_id), self.identity()).await
    }

    /// Base64 value of data entry `key` on `account`.
    ///
    /// Read from the account record unless `force_update` asks the ledger
    /// API directly.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidKey`] for a key that cannot be part of
    /// a path, or the request error.
    pub async fn account_data_entry(
        &self,
        account: &Account,
        key: &str,
        force_update: bool,
    ) -> Result<Option<String>, ManagerError> {
        if !force_update {
            return Ok(account.data.get(key).cloned());
        }
        if key.is_empty() || key.contains(['/', '?', '#']) {
            return Err(ManagerError::InvalidKey {
                family: RecordFamily::Accounts,
                key: key.to_string(),
            });
        }

        let path = format!("accounts/{}/data/{key}", account.account_id);
        let entry = self.managers.ledger_api().get(&path, &[]).await?;
        Ok(entry.and_then(|entry| entry.get("value")?.as_str().map(str::to_string)))
    }

    /// Sponsor of `account`, if it has one.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn account_sponsor(
        &self,
        account: &Account,
        force_update: bool,
    ) -> Result<Option<Entity<Account>>, ManagerError> {
        let Some(sponsor) = account.sponsor.as_deref() else {
            return Ok(None);
        };
        self.managers
            .accounts
            .fetch(sponsor, true, !force_update)
            .await
            .map(Some)
    }

    /// Last ledger that changed `account`.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn account_last_modified_ledger(
        &self,
        account: &Account,
        force_update: bool,
    ) -> Result<Entity<Ledger>, ManagerError> {
        self.managers
            .ledgers
            .fetch(&account.last_modified_ledger.to_string(), true, !force_update)
            .await
    }

    /// Accounts among the signers of `account`. Hash and pre-authorized
    /// transaction signers have no account and are left out.
    ///
    /// # Errors
    ///
    /// Returns the first lookup error.
    pub async fn account_signers(
        &self,
        account: &Account,
        force_update: bool,
    ) -> Result<Vec<Entity<Account>>, ManagerError> {
        let lookups = account
            .signers
            .iter()
            .filter(|signer| signer.signer_type == ED25519_SIGNER)
            .map(|signer| self.managers.accounts.fetch(&signer.key, true, !force_update));
        try_join_all(lookups).await
    }

    /// Issued assets held by `account`, the native balance excluded.
    ///
    /// # Errors
    ///
    /// Returns the first lookup error.
    pub async fn account_balance_assets(
        &self,
        account: &Account,
        force_update: bool,
    ) -> Result<Vec<Entity<Asset>>, ManagerError> {
        let keys: Vec<String> = account
            .balances
            .iter()
            .filter(|balance| !balance.asset.is_native())
            .map(|balance| balance.asset.canonical())
            .collect();
        let lookups = keys
            .iter()
            .map(|key| self.managers.assets.fetch(key, true, !force_update));
        try_join_all(lookups).await
    }

    // =========================================================================
    // Relevance
    // =========================================================================

    /// Whether ledger `sequence` concerns the configured account. Always true
    /// without an identity.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn is_ledger_relevant(&self, sequence: u64) -> Result<bool, ManagerError> {
        match self.identity.as_deref() {
            Some(id) => relevance::ledger_is_relevant(&self.managers, sequence, id).await,
            None => Ok(true),
        }
    }

    /// Whether transaction `hash` concerns the configured account. Always
    /// true without an identity.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn is_transaction_relevant(&self, hash: &str) -> Result<bool, ManagerError> {
        match self.identity.as_deref() {
            Some(id) => relevance::transaction_is_relevant(&self.managers, hash, id).await,
            None => Ok(true),
        }
    }

    /// Whether `trade` concerns the configured account. Always true without
    /// an identity.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn is_trade_relevant(
        &self,
        trade: &Trade,
        force_update: bool,
    ) -> Result<bool, ManagerError> {
        match self.identity.as_deref() {
            Some(id) => {
                relevance::trade_is_relevant(&self.managers, trade, id, force_update).await
            }
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::application::ports::{
        FeedRequest, HttpMethod, PushError, PushHandle, PushMessage, RequestError,
    };
    use crate::application::services::record_sources::decode_record;

    #[derive(Default)]
    struct FakeLedger {
        records: Vec<(String, Value)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLedger {
        fn with(mut self, path: &str, record: Value) -> Self {
            self.records.push((path.to_string(), record));
            self
        }
    }

    #[async_trait]
    impl LedgerApi for FakeLedger {
        async fn get(
            &self,
            path: &str,
            _query: &[(&str, &str)],
        ) -> Result<Option<Value>, RequestError> {
            self.calls.lock().push(path.to_string());
            Ok(self
                .records
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, v)| v.clone()))
        }
    }

    #[derive(Default)]
    struct FakePlatform {
        payment: Option<Value>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PlatformApi for FakePlatform {
        async fn call(
            &self,
            _method: HttpMethod,
            _route: &str,
            _payload: Option<Value>,
        ) -> Result<Option<Value>, RequestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payment.clone())
        }
    }

    #[derive(Default)]
    struct CountingConnector {
        opened: Mutex<Vec<StreamCategory>>,
        sinks: Mutex<Vec<mpsc::Sender<PushMessage>>>,
    }

    impl PushConnector for CountingConnector {
        fn open(
            &self,
            feed: FeedRequest,
            sink: mpsc::Sender<PushMessage>,
        ) -> Result<PushHandle, PushError> {
            self.opened.lock().push(feed.category);
            self.sinks.lock().push(sink);
            Ok(PushHandle::new(CancellationToken::new()))
        }
    }

    fn operation_json(id: &str, source: &str) -> Value {
        json!({
            "id": id,
            "paging_token": id,
            "type": "payment",
            "type_i": 1,
            "transaction_hash": "abc123",
            "source_account": source,
            "created_at": "2024-01-01T00:00:00Z",
            "from": source,
            "to": "GDEST",
            "asset_type": "native",
            "amount": "1.0000000"
        })
    }

    fn page(records: Vec<Value>) -> Value {
        json!({"_embedded": {"records": records}})
    }

    fn transaction_json(hash: &str, memo: Option<&str>) -> Value {
        json!({
            "id": hash,
            "paging_token": "1",
            "successful": true,
            "hash": hash,
            "ledger": 7,
            "created_at": "2024-01-01T00:00:00Z",
            "source_account": "GSRC",
            "source_account_sequence": "1",
            "fee_charged": "100",
            "max_fee": "100",
            "operation_count": 1,
            "envelope_xdr": "",
            "result_xdr": "",
            "result_meta_xdr": "",
            "fee_meta_xdr": "",
            "memo_type": "text",
            "memo": memo,
            "signatures": []
        })
    }

    fn transaction(memo: Option<&str>) -> Transaction {
        serde_json::from_value(transaction_json("abc123", memo)).unwrap()
    }

    fn account(value: Value) -> Account {
        serde_json::from_value(value).unwrap()
    }

    fn client(
        identity: Option<&str>,
        ledger: impl Into<Arc<FakeLedger>>,
        platform: impl Into<Arc<FakePlatform>>,
    ) -> (PiClient, Arc<CountingConnector>) {
        let config = ClientConfig {
            identity: identity.map(str::to_string),
            subscribed_categories: vec![StreamCategory::Payments, StreamCategory::Ledgers],
            ..ClientConfig::default()
        };
        let ledger: Arc<FakeLedger> = ledger.into();
        let platform: Arc<FakePlatform> = platform.into();
        let connector = Arc::new(CountingConnector::default());
        let client = PiClient::new(&config, platform, ledger, connector.clone());
        (client, connector)
    }

    #[tokio::test]
    async fn start_emits_ready_and_opens_configured_feeds() {
        let (client, connector) =
            client(Some("GME"), FakeLedger::default(), FakePlatform::default());
        let mut ready = client.events().ready_rx();

        assert_eq!(client.start(), 2);

        assert!(ready.try_recv().is_ok());
        assert_eq!(
            *connector.opened.lock(),
            vec![StreamCategory::Payments, StreamCategory::Ledgers]
        );
        assert_eq!(client.stop_all(), 2);
        assert!(client.streams().listening().is_empty());
    }

    #[tokio::test]
    async fn transaction_relevance_follows_operations() {
        let ledger = FakeLedger::default().with(
            "transactions/abc123/operations",
            page(vec![operation_json("9", "GME")]),
        );
        let (client, _) = client(Some("GME"), ledger, FakePlatform::default());

        assert!(client.is_transaction_relevant("abc123").await.unwrap());
        assert!(client.managers().operations.resolve("9").is_none());
    }

    #[tokio::test]
    async fn without_identity_everything_is_relevant() {
        let ledger = FakeLedger::default();
        let (client, _) = client(None, ledger, FakePlatform::default());

        assert!(client.is_ledger_relevant(7).await.unwrap());
        assert!(client.is_transaction_relevant("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn transaction_operations_skip_unrelated() {
        let ledger = FakeLedger::default().with(
            "transactions/abc123/operations",
            page(vec![operation_json("9", "GME"), operation_json("10", "GOTHER")]),
        );
        let (client, _) = client(Some("GME"), ledger, FakePlatform::default());

        let operations = client.transaction_operations("abc123").await.unwrap();

        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].read().id, "9");
        let cached = client.managers().operations.resolve("9").unwrap();
        assert!(cached.same_as(&operations[0]));
        assert!(client.managers().operations.resolve("10").is_none());
    }

    #[tokio::test]
    async fn collections_keep_everything_without_identity() {
        let ledger = FakeLedger::default().with(
            "ledgers/7/operations",
            page(vec![operation_json("9", "GME"), operation_json("10", "GOTHER")]),
        );
        let (client, _) = client(None, ledger, FakePlatform::default());

        let operations = client.ledger_operations(7).await.unwrap();

        assert_eq!(operations.len(), 2);
        assert_eq!(client.managers().operations.cache().len(), 2);
    }

    #[tokio::test]
    async fn account_effects_skip_unrelated() {
        let effect = |id: &str, account: &str| {
            json!({
                "id": id,
                "type": "account_created",
                "account": account,
                "starting_balance": "1"
            })
        };
        let ledger = FakeLedger::default().with(
            "accounts/GME/effects",
            page(vec![effect("9-1", "GME"), effect("10-1", "GOTHER")]),
        );
        let (client, _) = client(Some("GME"), ledger, FakePlatform::default());

        let effects = client.account_effects("GME").await.unwrap();

        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].read().account, "GME");
        assert!(client.managers().effects.resolve("10-1").is_none());
    }

    #[tokio::test]
    async fn account_transactions_are_filtered_by_their_operations() {
        let ledger = FakeLedger::default()
            .with(
                "accounts/GME/transactions",
                page(vec![transaction_json("t1", None), transaction_json("t2", None)]),
            )
            .with("transactions/t1/operations", page(vec![operation_json("1", "GME")]))
            .with("transactions/t2/operations", page(vec![operation_json("2", "GOTHER")]));
        let (client, _) = client(Some("GME"), ledger, FakePlatform::default());

        let transactions = client.account_transactions("GME").await.unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].read().hash, "t1");
        assert!(client.managers().transactions.resolve("t2").is_none());
    }

    #[tokio::test]
    async fn signers_skip_hash_keys_and_balances_skip_native() {
        let ledger = FakeLedger::default()
            .with(
                "accounts/GSIGN",
                json!({"id": "GSIGN", "account_id": "GSIGN", "sequence": "1"}),
            )
            .with(
                "assets",
                page(vec![json!({
                    "asset_type": "credit_alphanum4",
                    "asset_code": "PIE",
                    "asset_issuer": "GISS"
                })]),
            );
        let (client, _) = client(Some("GME"), ledger, FakePlatform::default());
        let me = account(json!({
            "id": "GME",
            "account_id": "GME",
            "sequence": "1",
            "balances": [
                {"balance": "1", "asset_type": "native"},
                {"balance": "5", "asset_type": "credit_alphanum4", "asset_code": "PIE", "asset_issuer": "GISS"}
            ],
            "signers": [
                {"key": "GSIGN", "weight": 1, "type": "ed25519_public_key"},
                {"key": "XHASH", "weight": 1, "type": "sha256_hash"}
            ]
        }));

        let signers = client.account_signers(&me, false).await.unwrap();
        let assets = client.account_balance_assets(&me, false).await.unwrap();

        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].read().account_id, "GSIGN");
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].read().descriptor.canonical(), "PIE:GISS");
        assert!(client.account_sponsor(&me, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn data_entry_reads_record_unless_forced() {
        let ledger = Arc::new(
            FakeLedger::default().with("accounts/GME/data/greeting", json!({"value": "bmV3"})),
        );
        let (client, _) = client(Some("GME"), ledger.clone(), FakePlatform::default());
        let me = account(json!({
            "id": "GME",
            "account_id": "GME",
            "sequence": "1",
            "data": {"greeting": "aGk="}
        }));

        let cached = client.account_data_entry(&me, "greeting", false).await.unwrap();
        assert!(ledger.calls.lock().is_empty());
        let fresh = client.account_data_entry(&me, "greeting", true).await.unwrap();

        assert_eq!(cached.as_deref(), Some("aGk="));
        assert_eq!(fresh.as_deref(), Some("bmV3"));
        assert!(matches!(
            client.account_data_entry(&me, "a/b", true).await,
            Err(ManagerError::InvalidKey { .. })
        ));
    }

    #[tokio::test]
    async fn payment_resolves_only_once_cached() {
        let platform = Arc::new(FakePlatform {
            payment: Some(json!({
                "identifier": "pay-1",
                "amount": "3.14",
                "memo": "Coffee",
                "status": {"developer_approved": true}
            })),
            ..FakePlatform::default()
        });
        let (client, _) = client(None, FakeLedger::default(), platform.clone());
        let tx = transaction(Some("pay-1"));

        assert_eq!(client.transaction_memo(&tx).as_deref(), Some("pay-1"));
        assert!(client.transaction_payment(&tx, false).await.unwrap().is_none());
        assert_eq!(platform.calls.load(Ordering::SeqCst), 0);

        client.managers().payments.fetch("pay-1", true, true).await.unwrap();
        let payment = client.transaction_payment(&tx, false).await.unwrap();

        assert!(payment.is_some());
        assert_eq!(platform.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.transaction_memo(&tx).as_deref(), Some("Coffee"));
    }

    #[tokio::test]
    async fn transaction_without_memo_has_no_payment() {
        let (client, _) = client(None, FakeLedger::default(), FakePlatform::default());
        let tx = transaction(None);

        assert_eq!(client.transaction_memo(&tx), None);
        assert!(client.transaction_payment(&tx, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cached_operation_transaction_skips_lookup_unless_forced() {
        let ledger = Arc::new(FakeLedger::default().with(
            "transactions/abc123",
            transaction_json("abc123", None),
        ));
        let (client, _) = client(None, ledger.clone(), FakePlatform::default());
        let raw = decode_record::<Operation>(operation_json("9", "GME")).unwrap();
        let operation = client.managers().operations.add(raw, true);

        let first = client
            .operation_transaction(&operation.read(), false)
            .await
            .unwrap();
        let second = client
            .operation_transaction(&operation.read(), false)
            .await
            .unwrap();
        client
            .operation_transaction(&operation.read(), true)
            .await
            .unwrap();

        assert!(first.same_as(&second));
        assert_eq!(ledger.calls.lock().len(), 2);
    }
}
