//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (HTTP, ledger API, push feeds).
pub mod ports;

/// Application services for caching, streaming and payments.
pub mod services;
