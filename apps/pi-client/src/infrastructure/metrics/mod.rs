//! Prometheus Metrics Module
//!
//! Exposes client metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **HTTP**: attempts by outcome, timeout retries, request latency
//! - **Streams**: messages received, filtered and failed, reconnects,
//!   listening state per category
//! - **Cache**: writes by family and outcome
//!
//! Recording before [`init_metrics`] is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::cache::AddOutcome;
use crate::domain::records::RecordFamily;
use crate::domain::subscription::StreamCategory;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Later calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // HTTP
    describe_counter!(
        "pi_client_http_attempts_total",
        "Total HTTP attempts by method and outcome"
    );
    describe_counter!(
        "pi_client_http_timeout_retries_total",
        "Total HTTP attempts retried after a timeout"
    );
    describe_histogram!(
        "pi_client_http_request_seconds",
        "Time from first attempt to final result"
    );

    // Streams
    describe_counter!(
        "pi_client_stream_messages_total",
        "Total records received from push feeds"
    );
    describe_counter!(
        "pi_client_stream_filtered_total",
        "Total records dropped as irrelevant to the configured account"
    );
    describe_counter!(
        "pi_client_stream_errors_total",
        "Total push feed errors"
    );
    describe_counter!(
        "pi_client_stream_reconnects_total",
        "Total push feed reconnection attempts"
    );
    describe_gauge!(
        "pi_client_stream_listening",
        "Whether a category is listening (1) or idle (0)"
    );

    // Cache
    describe_counter!(
        "pi_client_cache_writes_total",
        "Total cache adds by family and outcome"
    );
    describe_counter!(
        "pi_client_collection_filtered_total",
        "Total collection records skipped as irrelevant to the configured account"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for HTTP attempt outcomes.
#[derive(Debug, Clone, Copy)]
pub enum AttemptOutcome {
    /// Response received.
    Success,
    /// Attempt timed out.
    Timeout,
    /// Any other failure.
    Failure,
}

impl AttemptOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::Failure => "failure",
        }
    }
}

const fn add_outcome_label(outcome: AddOutcome) -> &'static str {
    match outcome {
        AddOutcome::Inserted => "inserted",
        AddOutcome::Detached => "detached",
        AddOutcome::Patched => "patched",
        AddOutcome::Unchanged => "unchanged",
    }
}

/// Record one HTTP attempt.
pub fn record_http_attempt(method: &'static str, outcome: AttemptOutcome) {
    counter!(
        "pi_client_http_attempts_total",
        "method" => method,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record a retry after a timed out attempt.
pub fn record_timeout_retry() {
    counter!("pi_client_http_timeout_retries_total").increment(1);
}

/// Record total request duration, retries included.
pub fn record_request_duration(duration: Duration) {
    histogram!("pi_client_http_request_seconds").record(duration.as_secs_f64());
}

/// Record a record received from a push feed.
pub fn record_stream_message(category: StreamCategory) {
    counter!(
        "pi_client_stream_messages_total",
        "category" => category.as_str()
    )
    .increment(1);
}

/// Record a record dropped by the relevance filter.
pub fn record_stream_filtered(category: StreamCategory) {
    counter!(
        "pi_client_stream_filtered_total",
        "category" => category.as_str()
    )
    .increment(1);
}

/// Record a push feed error.
pub fn record_stream_error(category: StreamCategory) {
    counter!(
        "pi_client_stream_errors_total",
        "category" => category.as_str()
    )
    .increment(1);
}

/// Record a push feed reconnection attempt.
pub fn record_stream_reconnect(category: StreamCategory) {
    counter!(
        "pi_client_stream_reconnects_total",
        "category" => category.as_str()
    )
    .increment(1);
}

/// Update the listening state of a category.
pub fn set_stream_listening(category: StreamCategory, listening: bool) {
    gauge!(
        "pi_client_stream_listening",
        "category" => category.as_str()
    )
    .set(if listening { 1.0 } else { 0.0 });
}

/// Record a cache add.
pub fn record_cache_write(family: RecordFamily, outcome: AddOutcome) {
    counter!(
        "pi_client_cache_writes_total",
        "family" => family.as_str(),
        "outcome" => add_outcome_label(outcome)
    )
    .increment(1);
}

/// Record collection records skipped by the relevance filter.
pub fn record_collection_filtered(family: RecordFamily, skipped: usize) {
    counter!(
        "pi_client_collection_filtered_total",
        "family" => family.as_str()
    )
    .increment(skipped as u64);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_outcome_as_str() {
        assert_eq!(AttemptOutcome::Success.as_str(), "success");
        assert_eq!(AttemptOutcome::Timeout.as_str(), "timeout");
        assert_eq!(AttemptOutcome::Failure.as_str(), "failure");
    }

    #[test]
    fn add_outcome_labels() {
        assert_eq!(add_outcome_label(AddOutcome::Inserted), "inserted");
        assert_eq!(add_outcome_label(AddOutcome::Patched), "patched");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_stream_message(StreamCategory::Ledgers);
        record_cache_write(RecordFamily::Accounts, AddOutcome::Inserted);
        set_stream_listening(StreamCategory::Trades, true);
    }
}
