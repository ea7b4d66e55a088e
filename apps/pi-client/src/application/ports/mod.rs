//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Transport`: sends one HTTP request
//! - `LedgerApi` / `PlatformApi`: request/response access to the two services
//! - `PushConnector`: opens server-push feeds
//! - `RecordSource`: raw record lookup behind an entity manager

mod api_port;
mod push_port;
mod record_source_port;
mod transport_port;

pub use api_port::{LedgerApi, PlatformApi, embedded_records};
pub use push_port::{FeedRequest, PushConnector, PushError, PushHandle, PushMessage};
pub use record_source_port::{ManagerError, RecordSource};
pub use transport_port::{
    HttpMethod, HttpRequestSpec, RequestError, Transport, TransportError, TransportResponse,
};
