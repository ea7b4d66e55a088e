//! HTTP Request Path
//!
//! Everything between a caller's request and the wire:
//!
//! - [`RequestSerializer`]: FIFO, one request in flight per client
//! - [`RetryingExecutor`]: timeout-only retries
//! - [`TransportClient`]: URL, headers and body from route and options
//! - [`ReqwestTransport`]: the `reqwest` adapter

mod client;
mod executor;
mod serializer;
mod transport;

pub use client::{RequestOptions, TransportClient, join_url};
pub use executor::{RetryingExecutor, parse_body};
pub use serializer::{RequestSerializer, RequestTicket};
pub(crate) use transport::classify;
pub use transport::ReqwestTransport;
