//! Ledger API Adapters
//!
//! Adapters for a Horizon-style ledger server:
//!
//! - [`HorizonClient`]: record lookups ([`LedgerApi`](crate::application::ports::LedgerApi))
//! - [`SseConnector`]: live record feeds
//!   ([`PushConnector`](crate::application::ports::PushConnector))

pub mod backoff;
pub mod codec;

mod client;
mod sse;

pub use backoff::{Backoff, BackoffConfig};
pub use client::HorizonClient;
pub use codec::{CodecError, SseDecoder, SseEvent};
pub use sse::SseConnector;
