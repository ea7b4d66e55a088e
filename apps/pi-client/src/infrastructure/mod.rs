//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the ambient runtime concerns.

/// Broadcast channels for client events.
pub mod broadcast;

/// Configuration loading.
pub mod config;

/// Ledger API adapters (lookups and event streams).
pub mod horizon;

/// Serialized, retrying HTTP request path.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
