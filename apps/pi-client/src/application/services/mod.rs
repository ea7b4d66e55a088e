//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `EntityManager` / `Managers`: cached record lookups per family
//! - `collections`: relevance-filtered records listed under another record
//! - `StreamSubscription` / `SubscriptionGroup`: live feed lifecycle
//! - `PaymentService`: platform payment approval and completion
//! - `PiClient`: facade over all of the above

mod client;
pub mod collections;
pub mod entity_manager;
pub mod payments;
pub mod record_sources;
pub mod relevance;
pub mod streams;

pub use client::PiClient;
pub use collections::Owner;
pub use entity_manager::{EntityManager, Managers};
pub use payments::{PaymentError, PaymentService};
pub use record_sources::{LedgerRecord, LedgerSource, LookupRoute, PaymentSource};
pub use streams::{Delivery, StreamContext, StreamSubscription, SubscriptionGroup};
