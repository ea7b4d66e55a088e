#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Pi Client - Pi Network Platform and Ledger Client
//!
//! A client runtime for the Pi platform API and the Horizon-style ledger API.
//! Every outbound request is serialized and retried on timeout, looked up
//! records live in identity-preserving caches, and live ledger feeds are
//! filtered for the configured account before they are cached and emitted.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Records and pure rules
//!   - `cache`: Identity-preserving entity cache
//!   - `records`: Ledger and platform records, effect/operation dispatch
//!   - `relevance`: Whether a record concerns the configured account
//!   - `subscription`: Feed categories and subscription state
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Transport, API, push feed and record source interfaces
//!   - `services`: Entity managers, stream subscriptions, payments, client
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `http`: Request serializer, retrying executor, reqwest transport
//!   - `horizon`: Ledger API lookups and server-sent event feeds
//!   - `broadcast`: Event channels
//!   - `config`: Environment configuration
//!   - `metrics` / `telemetry`: Prometheus metrics, tracing and OTLP export
//!
//! # Data Flow
//!
//! ```text
//!                    ┌──────────────┐     ┌───────────┐     ┌──────────┐
//! fetch / request ──►│  Serializer  │────►│ Executor  │────►│Transport │──► HTTP
//!                    └──────────────┘     └───────────┘     └──────────┘
//!
//! Horizon SSE ──► SseConnector ──► StreamSubscription ──► relevance ──► cache ──► EventHub
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Records, cache and relevance rules with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::cache::{CachedEntity, Entity, EntityCache};
pub use domain::subscription::{StreamCategory, StreamTarget, SubscriptionState};

// Client
pub use application::ports::{ManagerError, PushError, RequestError, TransportError};
pub use application::services::{PaymentError, PaymentService, PiClient};

// Infrastructure config
pub use infrastructure::config::{
    ClientConfig, ConfigError, Credentials, EventSettings, HttpSettings, StreamSettings,
};

// Event channels
pub use infrastructure::broadcast::{EventHub, ReadyEvent, StreamErrorEvent};

// Adapters
pub use infrastructure::horizon::{HorizonClient, SseConnector};
pub use infrastructure::http::{ReqwestTransport, TransportClient};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
