//! Transport Port (Driven Port)
//!
//! Interface for sending one HTTP request. Serialization, retries and
//! authentication live above this port; an adapter only moves bytes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Method name on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestSpec {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL, query string included.
    pub url: String,
    /// Headers, in insertion order, names unique case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Serialized body.
    pub body: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpRequestSpec {
    /// Value of a header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Status code.
    pub status: u16,
    /// `content-type` header, if present.
    pub content_type: Option<String>,
    /// Raw body.
    pub body: String,
}

impl TransportResponse {
    /// Whether the body is declared as JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("application/json"))
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established or broke.
    #[error("connection error: {message}")]
    Connect {
        /// Error details.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("server responded with status {status}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response body could not be read.
    #[error("failed to read response body: {message}")]
    Body {
        /// Error details.
        message: String,
    },

    /// The request could not be built.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Error details.
        message: String,
    },
}

impl TransportError {
    /// Whether this failure may be retried.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Failure of a request as seen by its caller, after retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Every attempt timed out.
    #[error("request timed out after {attempts} attempts")]
    Timeout {
        /// Attempts made.
        attempts: u32,
    },

    /// A non-timeout failure, never retried.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The JSON body could not be parsed.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Error details.
        message: String,
    },
}

impl RequestError {
    /// Status code of a non-success response, if that is what failed.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Port for sending one HTTP request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request once.
    ///
    /// Non-success statuses are reported as [`TransportError::Status`].
    async fn send(&self, request: &HttpRequestSpec) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn response(content_type: Option<&str>) -> TransportResponse {
        TransportResponse {
            status: 200,
            content_type: content_type.map(str::to_string),
            body: String::new(),
        }
    }

    #[test_case(Some("application/json"), true)]
    #[test_case(Some("application/json; charset=utf-8"), true)]
    #[test_case(Some("Application/JSON"), true)]
    #[test_case(Some("application/hal+json"), false)]
    #[test_case(Some("text/plain"), false)]
    #[test_case(None, false)]
    fn json_detection(content_type: Option<&str>, expected: bool) {
        assert_eq!(response(content_type).is_json(), expected);
    }

    #[test]
    fn only_timeouts_are_retryable() {
        assert!(TransportError::Timeout.is_timeout());
        assert!(!TransportError::Connect { message: "refused".into() }.is_timeout());
        assert!(!TransportError::Status { status: 504, body: String::new() }.is_timeout());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let spec = HttpRequestSpec {
            method: HttpMethod::Get,
            url: "https://example.test/".to_string(),
            headers: vec![("Authorization".to_string(), "Key abc".to_string())],
            body: None,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(spec.header("authorization"), Some("Key abc"));
        assert_eq!(spec.header("content-type"), None);
    }
}
