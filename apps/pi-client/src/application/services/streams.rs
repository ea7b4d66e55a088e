//! Stream Subscriptions
//!
//! Lifecycle of the ledger push feeds. A [`StreamSubscription`] owns at most
//! one open feed for its category plus the task pumping that feed's messages
//! into the caches and event channels. A [`SubscriptionGroup`] holds one
//! subscription per category.
//!
//! # Message Flow
//!
//! ```text
//! PushConnector ──mpsc──▶ pump ──▶ decode ──▶ relevance ──▶ cache add ──▶ EventHub
//!                                    │            │
//!                                    ▼            ▼
//!                               streamError     dropped
//! ```
//!
//! Feed errors never stop a subscription; only [`StreamSubscription::stop`]
//! does. A feed whose connector gives up and closes the channel leaves the
//! subscription idle, so it can be listened to again.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FeedRequest, ManagerError, PushConnector, PushHandle, PushMessage};
use crate::application::services::entity_manager::Managers;
use crate::application::services::record_sources::decode_record;
use crate::application::services::relevance::ledger_is_relevant;
use crate::domain::records::{Account, Effect, Ledger, Offer, Operation, Trade, Transaction};
use crate::domain::relevance::account_is_relevant;
use crate::domain::subscription::{StreamCategory, StreamTarget, SubscriptionState};
use crate::infrastructure::broadcast::EventHub;
use crate::infrastructure::metrics;

/// Messages buffered between a feed and its pump.
const FEED_BUFFER: usize = 256;

// =============================================================================
// Stream Context
// =============================================================================

/// What every pump needs: where records go and who they are filtered for.
#[derive(Debug)]
pub struct StreamContext {
    /// Account records are filtered for, if any.
    pub identity: Option<String>,
    /// Caches records are added to.
    pub managers: Arc<Managers>,
    /// Channels events are emitted on.
    pub events: Arc<EventHub>,
}

/// What happened to one received record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Added to its cache and emitted.
    Emitted,
    /// Irrelevant to the configured account; nothing was touched.
    Filtered,
}

impl StreamContext {
    /// Decode, filter, cache and emit one record of `category`.
    ///
    /// # Errors
    ///
    /// Returns an error when the record does not decode or the relevance
    /// lookup fails. Nothing is cached or emitted in that case.
    pub async fn deliver(
        &self,
        category: StreamCategory,
        record: Value,
    ) -> Result<Delivery, ManagerError> {
        let managers = &self.managers;
        let events = &self.events;

        match category {
            StreamCategory::Ledgers => {
                let raw = decode_record::<Ledger>(record)?;
                if let Some(id) = self.identity.as_deref()
                    && !ledger_is_relevant(managers, raw.sequence, id).await?
                {
                    return Ok(Delivery::Filtered);
                }
                events.send_ledger(managers.ledgers.add(raw, true));
            }
            StreamCategory::Transactions => {
                let raw = decode_record::<Transaction>(record)?;
                events.send_transaction(managers.transactions.add(raw, true));
            }
            StreamCategory::Operations => {
                let raw = decode_record::<Operation>(record)?;
                events.send_operation(managers.operations.add(raw, true));
            }
            StreamCategory::Payments => {
                let raw = decode_record::<Operation>(record)?;
                events.send_payment(managers.operations.add(raw, true));
            }
            StreamCategory::Effects => {
                let raw = decode_record::<Effect>(record)?;
                events.send_effect(managers.effects.add(raw, true));
            }
            StreamCategory::Accounts => {
                let raw = decode_record::<Account>(record)?;
                if let Some(id) = self.identity.as_deref()
                    && !account_is_relevant(&raw, id)
                {
                    return Ok(Delivery::Filtered);
                }
                events.send_account(managers.accounts.add(raw, true));
            }
            StreamCategory::Offers => {
                let raw = decode_record::<Offer>(record)?;
                events.send_offer(managers.offers.add(raw, true));
            }
            StreamCategory::Trades => {
                let raw = decode_record::<Trade>(record)?;
                events.send_trade(managers.trades.add(raw, true));
            }
        }

        Ok(Delivery::Emitted)
    }

    fn report_error(&self, category: StreamCategory, message: String) {
        tracing::warn!(category = %category, error = %message, "Stream error");
        metrics::record_stream_error(category);
        self.events.send_stream_error(category, message);
    }
}

async fn pump(
    category: StreamCategory,
    context: Arc<StreamContext>,
    mut rx: mpsc::Receiver<PushMessage>,
    cancel: CancellationToken,
    active: Arc<Mutex<Option<ActiveFeed>>>,
) {
    loop {
        let message = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = rx.recv() => message,
        };

        match message {
            Some(PushMessage::Record(record)) => {
                metrics::record_stream_message(category);
                match context.deliver(category, record).await {
                    Ok(Delivery::Emitted) => {}
                    Ok(Delivery::Filtered) => {
                        tracing::trace!(category = %category, "Dropped irrelevant record");
                        metrics::record_stream_filtered(category);
                    }
                    Err(e) => context.report_error(category, e.to_string()),
                }
            }
            Some(PushMessage::Error(message)) => context.report_error(category, message),
            None => {
                if retire(category, &active, &cancel) {
                    context.report_error(category, "feed closed".to_string());
                }
                break;
            }
        }
    }

    tracing::debug!(category = %category, "Stream pump stopped");
}

/// Clear the subscription after its connector gave up on the feed.
///
/// Returns false when the feed was stopped meanwhile. `stop` cancels under
/// the same lock, so an uncancelled token means the slot still holds this
/// pump's feed.
fn retire(
    category: StreamCategory,
    active: &Mutex<Option<ActiveFeed>>,
    cancel: &CancellationToken,
) -> bool {
    let mut slot = active.lock();
    if cancel.is_cancelled() {
        return false;
    }
    let feed = slot.take();
    drop(slot);
    drop(feed);

    metrics::set_stream_listening(category, false);
    tracing::warn!(category = %category, "Stream feed closed by connector");
    true
}

// =============================================================================
// Stream Subscription
// =============================================================================

struct ActiveFeed {
    handle: PushHandle,
    cancel: CancellationToken,
    pump: JoinHandle<()>,
}

/// Listen/stop lifecycle of one feed category.
pub struct StreamSubscription {
    category: StreamCategory,
    context: Arc<StreamContext>,
    connector: Arc<dyn PushConnector>,
    active: Arc<Mutex<Option<ActiveFeed>>>,
}

impl StreamSubscription {
    /// Create an idle subscription.
    #[must_use]
    pub fn new(
        category: StreamCategory,
        context: Arc<StreamContext>,
        connector: Arc<dyn PushConnector>,
    ) -> Self {
        Self {
            category,
            context,
            connector,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Category of this subscription.
    #[must_use]
    pub const fn category(&self) -> StreamCategory {
        self.category
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        if self.active.lock().is_some() {
            SubscriptionState::Listening
        } else {
            SubscriptionState::Idle
        }
    }

    /// Whether a feed is open.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state() == SubscriptionState::Listening
    }

    /// Open the feed at cursor `now` and start pumping it.
    ///
    /// Does nothing and returns `false` when already listening. A feed that
    /// cannot be opened is reported on `streamError` and the subscription
    /// stays idle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn listen(&self) -> bool {
        let mut active = self.active.lock();
        if active.is_some() {
            return false;
        }

        let feed = FeedRequest {
            category: self.category,
            path: self.category.feed_path(self.context.identity.as_deref()),
            cursor: FeedRequest::CURSOR_NOW.to_string(),
        };
        let (tx, rx) = mpsc::channel(FEED_BUFFER);

        let handle = match self.connector.open(feed, tx) {
            Ok(handle) => handle,
            Err(e) => {
                drop(active);
                self.context.report_error(self.category, e.to_string());
                return false;
            }
        };

        let cancel = CancellationToken::new();
        let pump = tokio::spawn(pump(
            self.category,
            Arc::clone(&self.context),
            rx,
            cancel.clone(),
            Arc::clone(&self.active),
        ));
        *active = Some(ActiveFeed {
            handle,
            cancel,
            pump,
        });
        drop(active);

        metrics::set_stream_listening(self.category, true);
        tracing::info!(category = %self.category, "Stream listening");
        true
    }

    /// Close the feed and stop its pump.
    ///
    /// Does nothing and returns `false` when idle.
    pub fn stop(&self) -> bool {
        let mut active = self.active.lock();
        let Some(feed) = active.take() else {
            return false;
        };
        feed.cancel.cancel();
        drop(active);

        feed.handle.close();
        feed.pump.abort();

        metrics::set_stream_listening(self.category, false);
        tracing::info!(category = %self.category, "Stream stopped");
        true
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        if let Some(feed) = self.active.lock().take() {
            feed.cancel.cancel();
        }
    }
}

impl fmt::Debug for StreamSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSubscription")
            .field("category", &self.category)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Subscription Group
// =============================================================================

/// One subscription per feed category.
#[derive(Debug)]
pub struct SubscriptionGroup {
    subscriptions: Vec<StreamSubscription>,
}

impl SubscriptionGroup {
    /// Create idle subscriptions for every category.
    #[must_use]
    pub fn new(context: &Arc<StreamContext>, connector: &Arc<dyn PushConnector>) -> Self {
        Self {
            subscriptions: StreamCategory::ALL
                .into_iter()
                .map(|category| {
                    StreamSubscription::new(category, Arc::clone(context), Arc::clone(connector))
                })
                .collect(),
        }
    }

    /// Subscription of one category.
    #[must_use]
    pub fn get(&self, category: StreamCategory) -> &StreamSubscription {
        // The vector is built from `StreamCategory::ALL`, in order.
        let index = StreamCategory::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or_default();
        &self.subscriptions[index]
    }

    /// Listen to one or every category. Returns how many feeds were opened.
    pub fn listen(&self, target: impl Into<StreamTarget>) -> usize {
        target
            .into()
            .categories()
            .into_iter()
            .filter(|c| self.get(*c).listen())
            .count()
    }

    /// Stop one or every category. Returns how many feeds were closed.
    pub fn stop(&self, target: impl Into<StreamTarget>) -> usize {
        target
            .into()
            .categories()
            .into_iter()
            .filter(|c| self.get(*c).stop())
            .count()
    }

    /// Categories currently listening.
    #[must_use]
    pub fn listening(&self) -> Vec<StreamCategory> {
        self.subscriptions
            .iter()
            .filter(|s| s.is_listening())
            .map(StreamSubscription::category)
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
