//! Remote API Ports (Driven Ports)
//!
//! Interfaces for the two request/response services the client talks to:
//! the read-only ledger API and the authenticated platform API.

use async_trait::async_trait;
use serde_json::Value;

use super::{HttpMethod, RequestError};

/// Port for ledger record lookups.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// GET `path` relative to the ledger base URL.
    ///
    /// Returns `Ok(None)` when the record does not exist.
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, RequestError>;
}

/// Port for platform API calls.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Call `route` relative to the platform base URL, authenticated.
    async fn call(
        &self,
        method: HttpMethod,
        route: &str,
        payload: Option<Value>,
    ) -> Result<Option<Value>, RequestError>;
}

/// Records embedded in a Horizon collection page.
#[must_use]
pub fn embedded_records(page: Value) -> Vec<Value> {
    match page {
        Value::Object(mut page) => match page.remove("_embedded") {
            Some(Value::Object(mut embedded)) => match embedded.remove("records") {
                Some(Value::Array(records)) => records,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_embedded_records() {
        let page = json!({
            "_links": {"next": {"href": "..."}},
            "_embedded": {"records": [{"id": "1"}, {"id": "2"}]}
        });
        let records = embedded_records(page);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], "2");
    }

    #[test]
    fn malformed_pages_yield_nothing() {
        assert!(embedded_records(json!({"id": "1"})).is_empty());
        assert!(embedded_records(json!({"_embedded": {"records": {}}})).is_empty());
        assert!(embedded_records(json!([1, 2])).is_empty());
    }
}
