//! Transport Client
//!
//! Builds outbound requests from a route, an optional JSON payload and
//! per-call options, then runs them one at a time through the serializer
//! and the retrying executor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use super::executor::{RetryingExecutor, parse_body};
use super::serializer::RequestSerializer;
use super::transport::ReqwestTransport;
use crate::application::ports::{
    HttpMethod, HttpRequestSpec, PlatformApi, RequestError, Transport, TransportError,
    TransportResponse,
};
use crate::infrastructure::config::{Credentials, HttpSettings};

/// Per-call request options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// Send the `Authorization` header when a credential is held.
    pub auth: bool,
    /// Extra headers, merged over the defaults.
    pub headers: Vec<(String, String)>,
    /// Query pairs appended to the URL.
    pub query: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            auth: true,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }
}

impl RequestOptions {
    /// Options for an unauthenticated request.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            auth: false,
            ..Self::default()
        }
    }

    /// Append a query pair.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }
}

/// Request builder and serialized executor for one remote service.
pub struct TransportClient {
    base_url: String,
    credentials: Option<Credentials>,
    timeout: Duration,
    multiplexed: bool,
    retry_limit: u32,
    serializer: RequestSerializer,
    executor: RetryingExecutor,
}

impl TransportClient {
    /// Create a client over any transport.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<Credentials>,
        settings: &HttpSettings,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            timeout: settings.request_timeout,
            multiplexed: settings.use_multiplexed_transport,
            retry_limit: settings.retry_limit,
            serializer: RequestSerializer::new(),
            executor: RetryingExecutor::new(transport),
        }
    }

    /// Create a client over a fresh reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_reqwest(
        base_url: impl Into<String>,
        credentials: Option<Credentials>,
        settings: &HttpSettings,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(settings.use_multiplexed_transport)?;
        Ok(Self::new(base_url, credentials, settings, Arc::new(transport)))
    }

    /// Base URL routes are joined to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the transport prefers a multiplexed connection.
    #[must_use]
    pub const fn is_multiplexed(&self) -> bool {
        self.multiplexed
    }

    /// Retries after a timed out attempt.
    #[must_use]
    pub const fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Serializer every request of this client goes through.
    #[must_use]
    pub const fn serializer(&self) -> &RequestSerializer {
        &self.serializer
    }

    /// Build the request for `route` without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the URL does not parse.
    pub fn build_request(
        &self,
        method: HttpMethod,
        route: &str,
        payload: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<HttpRequestSpec, RequestError> {
        let mut url = Url::parse(&join_url(&self.base_url, route)).map_err(|e| {
            TransportError::InvalidRequest {
                message: format!("bad URL for route '{route}': {e}"),
            }
        })?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&options.query);
        }

        let mut headers = Vec::new();
        if options.auth
            && let Some(credentials) = &self.credentials
        {
            headers.push((
                "Authorization".to_string(),
                format!("Key {}", credentials.api_key()),
            ));
        }
        for (name, value) in &options.headers {
            set_header(&mut headers, name.clone(), value.clone());
        }

        let body = match payload {
            Some(payload) => {
                set_header(
                    &mut headers,
                    "Content-Type".to_string(),
                    "application/json".to_string(),
                );
                Some(payload.to_string())
            }
            None => None,
        };

        Ok(HttpRequestSpec {
            method,
            url: url.into(),
            headers,
            body,
            timeout: self.timeout,
        })
    }

    /// Build and run a request, waiting for this client's turn first.
    ///
    /// # Errors
    ///
    /// Returns the build or execution error.
    pub async fn request(
        &self,
        method: HttpMethod,
        route: &str,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> Result<Option<Value>, RequestError> {
        parse_body(self.send(method, route, payload, options).await?)
    }

    /// Like [`TransportClient::request`], but return the raw response.
    ///
    /// # Errors
    ///
    /// Returns the build or execution error.
    pub async fn send(
        &self,
        method: HttpMethod,
        route: &str,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> Result<TransportResponse, RequestError> {
        let spec = self.build_request(method, route, payload.as_ref(), &options)?;

        let ticket = self.serializer.acquire().await;
        tracing::debug!(method = %method, url = %spec.url, "Sending request");
        let result = self.executor.send(&spec, self.retry_limit).await;
        ticket.release();

        result
    }
}

#[async_trait]
impl PlatformApi for TransportClient {
    async fn call(
        &self,
        method: HttpMethod,
        route: &str,
        payload: Option<Value>,
    ) -> Result<Option<Value>, RequestError> {
        self.request(method, route, payload, RequestOptions::default()).await
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .field("multiplexed", &self.multiplexed)
            .field("retry_limit", &self.retry_limit)
            .finish_non_exhaustive()
    }
}

/// Join `route` to `base` with exactly one `/` between them.
#[must_use]
pub fn join_url(base: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}

fn set_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
    {
        Some(entry) => *entry = (name, value),
        None => headers.push((name, value)),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<HttpRequestSpec>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(
            &self,
            request: &HttpRequestSpec,
        ) -> Result<TransportResponse, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.sent.lock().push(request.clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(TransportResponse {
                status: 200,
                content_type: Some("application/json".to_string()),
                body: "{\"ok\":true}".to_string(),
            })
        }
    }

    fn client(credentials: Option<&str>) -> (TransportClient, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let client = TransportClient::new(
            "https://api.example.test/",
            credentials.map(|key| Credentials::new(key.to_string())),
            &HttpSettings::default(),
            transport.clone(),
        );
        (client, transport)
    }

    #[test]
    fn auth_header_uses_key_scheme() {
        let (client, _) = client(Some("secret"));

        let spec = client
            .build_request(HttpMethod::Get, "v2/me", None, &RequestOptions::default())
            .unwrap();

        assert_eq!(spec.url, "https://api.example.test/v2/me");
        assert_eq!(spec.header("authorization"), Some("Key secret"));
        assert_eq!(spec.header("content-type"), None);
        assert!(spec.body.is_none());
    }

    #[test]
    fn auth_can_be_disabled() {
        let (client, _) = client(Some("secret"));

        let spec = client
            .build_request(HttpMethod::Get, "ledgers", None, &RequestOptions::anonymous())
            .unwrap();

        assert_eq!(spec.header("authorization"), None);
    }

    #[test]
    fn no_credential_means_no_auth_header() {
        let (client, _) = client(None);

        let spec = client
            .build_request(HttpMethod::Get, "v2/me", None, &RequestOptions::default())
            .unwrap();

        assert!(spec.headers.is_empty());
    }

    #[test]
    fn caller_headers_override_defaults() {
        let (client, _) = client(Some("secret"));
        let options = RequestOptions::default()
            .with_header("authorization", "Bearer token")
            .with_header("X-Trace", "1");

        let spec = client
            .build_request(HttpMethod::Get, "v2/me", None, &options)
            .unwrap();

        assert_eq!(spec.header("Authorization"), Some("Bearer token"));
        assert_eq!(spec.header("x-trace"), Some("1"));
        assert_eq!(spec.headers.len(), 2);
    }

    #[test]
    fn payload_sets_json_body() {
        let (client, _) = client(Some("secret"));
        let payload = json!({"txid": "abc"});

        let spec = client
            .build_request(
                HttpMethod::Post,
                "/v2/payments/p/complete",
                Some(&payload),
                &RequestOptions::default(),
            )
            .unwrap();

        assert_eq!(spec.url, "https://api.example.test/v2/payments/p/complete");
        assert_eq!(spec.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_str(spec.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, payload);
    }

    #[test]
    fn query_pairs_are_encoded() {
        let (client, _) = client(None);
        let options = RequestOptions::anonymous()
            .with_query("asset_code", "PI")
            .with_query("memo", "a b&c");

        let spec = client
            .build_request(HttpMethod::Get, "assets", None, &options)
            .unwrap();

        assert_eq!(
            spec.url,
            "https://api.example.test/assets?asset_code=PI&memo=a+b%26c"
        );
    }

    #[tokio::test]
    async fn concurrent_requests_are_serialized() {
        let (client, transport) = client(Some("secret"));
        let client = Arc::new(client);

        let calls = (0..4).map(|i| {
            let client = Arc::clone(&client);
            async move {
                client
                    .request(
                        HttpMethod::Get,
                        &format!("v2/items/{i}"),
                        None,
                        RequestOptions::default(),
                    )
                    .await
            }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(transport.sent.lock().len(), 4);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(!client.serializer().is_busy());
    }

    proptest! {
        #[test]
        fn join_url_uses_exactly_one_slash(
            base in "https://[a-z]{1,10}\\.test(/[a-z]{1,5}){0,2}",
            base_slashes in 0usize..3,
            route in "[a-z]{1,8}(/[a-z0-9]{1,4}){0,3}",
            route_slashes in 0usize..3,
        ) {
            let joined = join_url(
                &format!("{base}{}", "/".repeat(base_slashes)),
                &format!("{}{route}", "/".repeat(route_slashes)),
            );
            prop_assert_eq!(joined, format!("{base}/{route}"));
        }
    }
}
