//! Client Event Channels
//!
//! Implements event distribution using tokio broadcast channels
//! for fan-out to any number of listeners.
//!
//! # Architecture
//!
//! The `EventHub` provides a separate channel for each client event:
//! - `ledger`, `transaction`, `operation`, `payment`, `effect`, `account`,
//!   `offer` and `trade` carry the cached entity a stream just added
//! - `stream_error` carries non-fatal push feed errors
//! - `ready` fires once the client has started
//!
//! Every entity event carries an [`Entity`] handle, so listeners see later
//! patches of the same record. Dropping a receiver unsubscribes it.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::cache::Entity;
use crate::domain::records::{Account, Effect, Ledger, Offer, Operation, Trade, Transaction};
use crate::domain::subscription::StreamCategory;

// =============================================================================
// Event Payloads
// =============================================================================

/// Non-fatal push feed error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamErrorEvent {
    /// Feed that failed.
    pub category: StreamCategory,
    /// Error details.
    pub message: String,
}

/// Client finished starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyEvent;

// =============================================================================
// Event Hub
// =============================================================================

/// Default capacity of each event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Central hub for all client events.
///
/// Lagging receivers lose the oldest events of their channel; senders never
/// block.
#[derive(Debug)]
#[allow(clippy::struct_field_names)]
pub struct EventHub {
    ledger_tx: broadcast::Sender<Entity<Ledger>>,
    transaction_tx: broadcast::Sender<Entity<Transaction>>,
    operation_tx: broadcast::Sender<Entity<Operation>>,
    payment_tx: broadcast::Sender<Entity<Operation>>,
    effect_tx: broadcast::Sender<Entity<Effect>>,
    account_tx: broadcast::Sender<Entity<Account>>,
    offer_tx: broadcast::Sender<Entity<Offer>>,
    trade_tx: broadcast::Sender<Entity<Trade>>,
    stream_error_tx: broadcast::Sender<StreamErrorEvent>,
    ready_tx: broadcast::Sender<ReadyEvent>,
}

impl EventHub {
    /// Create a hub whose channels each hold `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ledger_tx: broadcast::channel(capacity).0,
            transaction_tx: broadcast::channel(capacity).0,
            operation_tx: broadcast::channel(capacity).0,
            payment_tx: broadcast::channel(capacity).0,
            effect_tx: broadcast::channel(capacity).0,
            account_tx: broadcast::channel(capacity).0,
            offer_tx: broadcast::channel(capacity).0,
            trade_tx: broadcast::channel(capacity).0,
            stream_error_tx: broadcast::channel(capacity).0,
            ready_tx: broadcast::channel(capacity).0,
        }
    }

    /// Create a hub with the default capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }

    // =========================================================================
    // Ledger Records
    // =========================================================================

    /// Emit a `ledger` event.
    ///
    /// Returns the number of receivers that got the event, or `None` if there
    /// are no active receivers.
    pub fn send_ledger(&self, ledger: Entity<Ledger>) -> Option<usize> {
        self.ledger_tx.send(ledger).ok()
    }

    /// Subscribe to `ledger` events.
    #[must_use]
    pub fn ledger_rx(&self) -> broadcast::Receiver<Entity<Ledger>> {
        self.ledger_tx.subscribe()
    }

    /// Emit a `transaction` event.
    pub fn send_transaction(&self, transaction: Entity<Transaction>) -> Option<usize> {
        self.transaction_tx.send(transaction).ok()
    }

    /// Subscribe to `transaction` events.
    #[must_use]
    pub fn transaction_rx(&self) -> broadcast::Receiver<Entity<Transaction>> {
        self.transaction_tx.subscribe()
    }

    /// Emit an `operation` event.
    pub fn send_operation(&self, operation: Entity<Operation>) -> Option<usize> {
        self.operation_tx.send(operation).ok()
    }

    /// Subscribe to `operation` events.
    #[must_use]
    pub fn operation_rx(&self) -> broadcast::Receiver<Entity<Operation>> {
        self.operation_tx.subscribe()
    }

    /// Emit a `payment` event.
    pub fn send_payment(&self, payment: Entity<Operation>) -> Option<usize> {
        self.payment_tx.send(payment).ok()
    }

    /// Subscribe to `payment` events.
    #[must_use]
    pub fn payment_rx(&self) -> broadcast::Receiver<Entity<Operation>> {
        self.payment_tx.subscribe()
    }

    /// Emit an `effect` event.
    pub fn send_effect(&self, effect: Entity<Effect>) -> Option<usize> {
        self.effect_tx.send(effect).ok()
    }

    /// Subscribe to `effect` events.
    #[must_use]
    pub fn effect_rx(&self) -> broadcast::Receiver<Entity<Effect>> {
        self.effect_tx.subscribe()
    }

    /// Emit an `account` event.
    pub fn send_account(&self, account: Entity<Account>) -> Option<usize> {
        self.account_tx.send(account).ok()
    }

    /// Subscribe to `account` events.
    #[must_use]
    pub fn account_rx(&self) -> broadcast::Receiver<Entity<Account>> {
        self.account_tx.subscribe()
    }

    /// Emit an `offer` event.
    pub fn send_offer(&self, offer: Entity<Offer>) -> Option<usize> {
        self.offer_tx.send(offer).ok()
    }

    /// Subscribe to `offer` events.
    #[must_use]
    pub fn offer_rx(&self) -> broadcast::Receiver<Entity<Offer>> {
        self.offer_tx.subscribe()
    }

    /// Emit a `trade` event.
    pub fn send_trade(&self, trade: Entity<Trade>) -> Option<usize> {
        self.trade_tx.send(trade).ok()
    }

    /// Subscribe to `trade` events.
    #[must_use]
    pub fn trade_rx(&self) -> broadcast::Receiver<Entity<Trade>> {
        self.trade_tx.subscribe()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Emit a `streamError` event.
    pub fn send_stream_error(&self, category: StreamCategory, message: String) -> Option<usize> {
        self.stream_error_tx
            .send(StreamErrorEvent { category, message })
            .ok()
    }

    /// Subscribe to `streamError` events.
    #[must_use]
    pub fn stream_error_rx(&self) -> broadcast::Receiver<StreamErrorEvent> {
        self.stream_error_tx.subscribe()
    }

    /// Emit the `ready` event.
    pub fn send_ready(&self) -> Option<usize> {
        self.ready_tx.send(ReadyEvent).ok()
    }

    /// Subscribe to the `ready` event.
    #[must_use]
    pub fn ready_rx(&self) -> broadcast::Receiver<ReadyEvent> {
        self.ready_tx.subscribe()
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get statistics about all channels.
    #[must_use]
    pub fn stats(&self) -> EventStats {
        EventStats {
            record_receivers: self.ledger_tx.receiver_count()
                + self.transaction_tx.receiver_count()
                + self.operation_tx.receiver_count()
                + self.payment_tx.receiver_count()
                + self.effect_tx.receiver_count()
                + self.account_tx.receiver_count()
                + self.offer_tx.receiver_count()
                + self.trade_tx.receiver_count(),
            stream_error_receivers: self.stream_error_tx.receiver_count(),
            ready_receivers: self.ready_tx.receiver_count(),
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Shared event hub reference.
pub type SharedEventHub = Arc<EventHub>;

/// Statistics about event channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStats {
    /// Receivers across the eight record channels.
    pub record_receivers: usize,
    /// `streamError` receivers.
    pub stream_error_receivers: usize,
    /// `ready` receivers.
    pub ready_receivers: usize,
}

impl EventStats {
    /// Get total number of receivers across all channels.
    #[must_use]
    pub const fn total_receivers(&self) -> usize {
        self.record_receivers + self.stream_error_receivers + self.ready_receivers
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::cache::EntityCache;

    fn ledger(sequence: u64) -> Entity<Ledger> {
        let cache = EntityCache::<Ledger>::new();
        cache.add(
            serde_json::from_value(json!({"id": "h", "hash": "h", "sequence": sequence})).unwrap(),
            true,
        )
    }

    #[test]
    fn hub_starts_without_receivers() {
        let hub = EventHub::with_defaults();
        assert_eq!(hub.stats().total_receivers(), 0);
    }

    #[test]
    fn send_without_receivers_returns_none() {
        let hub = EventHub::with_defaults();
        assert!(hub.send_ledger(ledger(1)).is_none());
        assert!(hub.send_ready().is_none());
    }

    #[tokio::test]
    async fn every_receiver_gets_the_same_entity() {
        let hub = EventHub::new(8);
        let mut first = hub.ledger_rx();
        let mut second = hub.ledger_rx();
        let sent = ledger(7);

        assert_eq!(hub.send_ledger(sent.clone()), Some(2));

        let a = first.recv().await.unwrap();
        let b = second.recv().await.unwrap();
        assert!(a.same_as(&sent));
        assert!(b.same_as(&sent));
    }

    #[tokio::test]
    async fn stream_error_carries_category() {
        let hub = EventHub::new(8);
        let mut rx = hub.stream_error_rx();

        hub.send_stream_error(StreamCategory::Trades, "boom".to_string());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.category, StreamCategory::Trades);
        assert_eq!(event.message, "boom");
    }

    #[test]
    fn dropping_receiver_unsubscribes() {
        let hub = EventHub::new(8);
        let rx = hub.payment_rx();
        assert_eq!(hub.stats().record_receivers, 1);

        drop(rx);
        assert_eq!(hub.stats().record_receivers, 0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let hub = EventHub::new(0);
        let _rx = hub.ready_rx();
        assert_eq!(hub.send_ready(), Some(1));
    }
}
