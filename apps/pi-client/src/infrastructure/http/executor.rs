//! Retrying Executor
//!
//! Runs one request through a [`Transport`], retrying only attempts that
//! timed out. Retries are immediate; at most `retry_limit + 1` attempts are
//! made.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::application::ports::{HttpRequestSpec, RequestError, Transport, TransportResponse};
use crate::infrastructure::metrics::{self, AttemptOutcome};

/// Timeout-only retry loop around a transport.
#[derive(Clone)]
pub struct RetryingExecutor {
    transport: Arc<dyn Transport>,
}

impl RetryingExecutor {
    /// Create an executor over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Execute `spec`, returning the JSON body if the response declares one.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Timeout`] once every attempt timed out, the
    /// transport error of the first non-timeout failure, or
    /// [`RequestError::Decode`] for a malformed JSON body.
    pub async fn execute(
        &self,
        spec: &HttpRequestSpec,
        retry_limit: u32,
    ) -> Result<Option<Value>, RequestError> {
        parse_body(self.send(spec, retry_limit).await?)
    }

    /// Execute `spec` and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Timeout`] once every attempt timed out, or the
    /// transport error of the first non-timeout failure.
    pub async fn send(
        &self,
        spec: &HttpRequestSpec,
        retry_limit: u32,
    ) -> Result<TransportResponse, RequestError> {
        let started = Instant::now();
        let method = spec.method.as_str();
        let mut attempt: u32 = 0;

        let result = loop {
            attempt += 1;
            match self.transport.send(spec).await {
                Ok(response) => {
                    metrics::record_http_attempt(method, AttemptOutcome::Success);
                    break Ok(response);
                }
                Err(e) if e.is_timeout() => {
                    metrics::record_http_attempt(method, AttemptOutcome::Timeout);
                    if attempt <= retry_limit {
                        metrics::record_timeout_retry();
                        tracing::debug!(
                            method,
                            url = %spec.url,
                            attempt,
                            retry_limit,
                            "Request timed out, retrying"
                        );
                        continue;
                    }
                    break Err(RequestError::Timeout { attempts: attempt });
                }
                Err(e) => {
                    metrics::record_http_attempt(method, AttemptOutcome::Failure);
                    break Err(e.into());
                }
            }
        };

        metrics::record_request_duration(started.elapsed());
        result
    }
}

impl std::fmt::Debug for RetryingExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingExecutor").finish_non_exhaustive()
    }
}

/// JSON body of a response declared as `application/json`, else `None`.
///
/// # Errors
///
/// Returns [`RequestError::Decode`] for a malformed JSON body.
pub fn parse_body(response: TransportResponse) -> Result<Option<Value>, RequestError> {
    if !response.is_json() {
        return Ok(None);
    }
    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|e| RequestError::Decode {
            message: e.to_string(),
        })
}

// =============================================================================
// Tests
// =============================================================================
