//! Record Source Port (Driven Port)
//!
//! Interface for looking up one raw record by cache key, used by entity
//! managers on a cache miss.

use async_trait::async_trait;

use super::RequestError;
use crate::domain::cache::CachedEntity;
use crate::domain::records::RecordFamily;

/// Entity manager error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagerError {
    /// The remote service has no record under this key.
    #[error("{family} record not found: {key}")]
    NotFound {
        /// Record family.
        family: RecordFamily,
        /// Key looked up.
        key: String,
    },

    /// The family has no lookup route.
    #[error("{family} records cannot be fetched individually")]
    Unsupported {
        /// Record family.
        family: RecordFamily,
    },

    /// The key is malformed for this family.
    #[error("invalid {family} key: {key}")]
    InvalidKey {
        /// Record family.
        family: RecordFamily,
        /// Offending key.
        key: String,
    },

    /// The record was found but did not decode.
    #[error("failed to decode {family} record: {message}")]
    Decode {
        /// Record family.
        family: RecordFamily,
        /// Error details.
        message: String,
    },

    /// The lookup request failed.
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Port for looking up raw records of one family.
#[async_trait]
pub trait RecordSource<V: CachedEntity>: Send + Sync {
    /// Fetch the raw record for `key`, `Ok(None)` when absent.
    async fn lookup(&self, key: &str) -> Result<Option<V::Raw>, ManagerError>;
}
