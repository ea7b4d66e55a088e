//! Ledger API Client
//!
//! [`LedgerApi`] adapter for a Horizon server. Lookups are anonymous GETs
//! through a [`TransportClient`], so they share its serializer and timeout
//! retries. A `404` means the record does not exist.

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{
    HttpMethod, LedgerApi, RequestError, TransportError, TransportResponse,
};
use crate::infrastructure::http::{RequestOptions, TransportClient};

/// Horizon lookup client.
#[derive(Debug)]
pub struct HorizonClient {
    http: TransportClient,
}

impl HorizonClient {
    /// Create a client over a transport client pointed at the ledger API.
    #[must_use]
    pub const fn new(http: TransportClient) -> Self {
        Self { http }
    }

    /// Ledger API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }
}

#[async_trait]
impl LedgerApi for HorizonClient {
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, RequestError> {
        let options = query
            .iter()
            .fold(RequestOptions::anonymous(), |options, (name, value)| {
                options.with_query(*name, *value)
            })
            .with_header("Accept", "application/hal+json, application/json");

        match self.http.send(HttpMethod::Get, path, None, options).await {
            Ok(response) => decode_document(&response),
            Err(e) if e.status() == Some(404) => {
                tracing::debug!(path, "Ledger record not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Horizon answers with `application/hal+json`; any JSON media type is
/// accepted here.
fn decode_document(response: &TransportResponse) -> Result<Option<Value>, RequestError> {
    let is_json = response
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .is_some_and(|media| media == "application/json" || media.ends_with("+json"));
    if !is_json {
        return Err(TransportError::Body {
            message: format!(
                "unexpected content type {:?} from ledger API",
                response.content_type
            ),
        }
        .into());
    }

    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|e| RequestError::Decode {
            message: e.to_string(),
        })
}
