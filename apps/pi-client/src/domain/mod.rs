//! Domain Layer - Records, caching and stream categories.
//!
//! This layer contains the ledger and platform record types, the
//! identity-preserving cache they live in, and the pure rules deciding which
//! records matter to the configured account. Nothing here performs I/O.

/// Identity-preserving entity cache.
pub mod cache;

/// Ledger and platform record types with type-tag dispatch.
pub mod records;

/// Account relevance rules.
pub mod relevance;

/// Push feed categories and subscription state.
pub mod subscription;
