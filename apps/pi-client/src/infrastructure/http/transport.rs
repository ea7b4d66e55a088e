//! Reqwest Transport
//!
//! [`Transport`] adapter over `reqwest`. Redirects are not followed and the
//! per-request timeout covers the whole exchange, body included.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, redirect};

use crate::application::ports::{
    HttpMethod, HttpRequestSpec, Transport, TransportError, TransportResponse,
};

/// HTTP transport backed by a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport.
    ///
    /// With `multiplexed` unset the client speaks HTTP/1.1 only; otherwise
    /// HTTP/2 is negotiated when the server offers it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(multiplexed: bool) -> Result<Self, TransportError> {
        let mut builder = Client::builder().redirect(redirect::Policy::none());
        if !multiplexed {
            builder = builder.http1_only();
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::InvalidRequest {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Underlying client, shared with the event stream connector.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequestSpec) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(method(request.method), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body {
                    message: e.to_string(),
                }
            }
        })?;

        if !(200..300).contains(&status) {
            return Err(TransportError::Status { status, body });
        }

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Map a send failure onto the retry classification.
pub(crate) fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_builder() {
        TransportError::InvalidRequest {
            message: error.to_string(),
        }
    } else {
        TransportError::Connect {
            message: error.to_string(),
        }
    }
}
