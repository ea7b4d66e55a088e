//! Event Stream Connector
//!
//! [`PushConnector`] adapter streaming ledger records as server-sent events.
//! Each open feed runs in its own task until its handle is closed:
//!
//! 1. GET `<base>/<path>?cursor=<cursor>` with `Accept: text/event-stream`
//! 2. Decode events, skip control frames, forward records to the sink
//! 3. On error or server close, report it, back off and reconnect from the
//!    last event id seen
//!
//! A feed opened again after a close starts over from its requested cursor.

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Url};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::backoff::{Backoff, BackoffConfig};
use super::codec::{SseDecoder, decode_record};
use crate::application::ports::{
    FeedRequest, PushConnector, PushError, PushHandle, PushMessage, TransportError,
};
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::http::{classify, join_url};
use crate::infrastructure::metrics;

/// Why one connection of a feed ended.
#[derive(Debug, thiserror::Error)]
enum FeedError {
    /// Connecting or reading failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server refused the feed.
    #[error("feed responded with status {0}")]
    Status(u16),

    /// The server ended the response.
    #[error("feed closed by server")]
    Closed,

    /// The feed URL could not be built.
    #[error(transparent)]
    Invalid(#[from] PushError),
}

/// Server-sent events connector for the ledger API.
#[derive(Debug, Clone)]
pub struct SseConnector {
    client: Client,
    base_url: String,
    backoff: BackoffConfig,
}

impl SseConnector {
    /// Create a connector.
    ///
    /// `client` must not carry a total request timeout, or feeds will be cut
    /// off after it.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, backoff: BackoffConfig) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            backoff,
        }
    }

    /// Create a connector for the configured ledger API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, PushError> {
        let client = Client::builder()
            .connect_timeout(config.http.request_timeout)
            .build()
            .map_err(|e| PushError::Open {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self::new(
            client,
            config.ledger_base_url.clone(),
            BackoffConfig::from_stream_settings(&config.stream),
        ))
    }

    /// URL of `feed`, resuming after `last_event_id` when given.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::InvalidFeed`] if the URL does not parse.
    pub fn feed_url(
        &self,
        feed: &FeedRequest,
        last_event_id: Option<&str>,
    ) -> Result<Url, PushError> {
        let mut url = Url::parse(&join_url(&self.base_url, &feed.path)).map_err(|e| {
            PushError::InvalidFeed {
                message: format!("bad feed URL for '{}': {e}", feed.path),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("cursor", last_event_id.unwrap_or(&feed.cursor));
        Ok(url)
    }
}

impl PushConnector for SseConnector {
    fn open(
        &self,
        feed: FeedRequest,
        sink: mpsc::Sender<PushMessage>,
    ) -> Result<PushHandle, PushError> {
        self.feed_url(&feed, None)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| PushError::Open {
            message: e.to_string(),
        })?;

        let cancel = CancellationToken::new();
        let session = FeedSession {
            connector: self.clone(),
            feed,
            sink,
            cancel: cancel.clone(),
            backoff: Backoff::new(self.backoff.clone()),
            last_event_id: None,
        };
        runtime.spawn(session.run());

        Ok(PushHandle::new(cancel))
    }
}

/// One open feed, across reconnects.
struct FeedSession {
    connector: SseConnector,
    feed: FeedRequest,
    sink: mpsc::Sender<PushMessage>,
    cancel: CancellationToken,
    backoff: Backoff,
    last_event_id: Option<String>,
}

impl FeedSession {
    async fn run(mut self) {
        let category = self.feed.category;

        loop {
            let cancel = self.cancel.clone();
            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.connect_and_read() => outcome,
            };

            if self.sink.is_closed() {
                break;
            }
            if let Err(e) = outcome {
                tracing::warn!(category = %category, error = %e, "Event stream interrupted");
                if self.sink.send(PushMessage::Error(e.to_string())).await.is_err() {
                    break;
                }
            }

            let Some(delay) = self.backoff.next_delay() else {
                let _ = self
                    .sink
                    .send(PushMessage::Error(
                        "maximum reconnection attempts exceeded".to_string(),
                    ))
                    .await;
                break;
            };
            metrics::record_stream_reconnect(category);
            tracing::info!(
                category = %category,
                attempt = self.backoff.attempts(),
                delay_ms = delay.as_millis(),
                "Reconnecting event stream"
            );

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        tracing::debug!(category = %category, "Event stream task finished");
    }

    /// Stream one connection. Returns `Ok` only when the sink is gone.
    async fn connect_and_read(&mut self) -> Result<(), FeedError> {
        let url = self
            .connector
            .feed_url(&self.feed, self.last_event_id.as_deref())?;
        tracing::info!(category = %self.feed.category, url = %url, "Connecting event stream");

        let mut request = self
            .connector
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = &self.last_event_id {
            request = request.header("Last-Event-ID", id.as_str());
        }

        let response = request.send().await.map_err(classify)?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(classify)?;
            for event in decoder.push(&chunk) {
                if let Some(id) = &event.id {
                    self.last_event_id = Some(id.clone());
                }
                let message = match decode_record(&event) {
                    Ok(Some(record)) => {
                        self.backoff.reset();
                        PushMessage::Record(record)
                    }
                    Ok(None) => continue,
                    Err(e) => PushMessage::Error(e.to_string()),
                };
                if self.sink.send(message).await.is_err() {
                    return Ok(());
                }
            }
        }

        Err(FeedError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::StreamCategory;

    fn connector(base_url: &str) -> SseConnector {
        SseConnector::new(Client::new(), base_url, BackoffConfig::default())
    }

    fn feed(path: &str) -> FeedRequest {
        FeedRequest {
            category: StreamCategory::Payments,
            path: path.to_string(),
            cursor: FeedRequest::CURSOR_NOW.to_string(),
        }
    }

    #[test]
    fn fresh_feed_starts_now() {
        let url = connector("https://horizon.example.test/")
            .feed_url(&feed("accounts/GABC/payments"), None)
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://horizon.example.test/accounts/GABC/payments?cursor=now"
        );
    }

    #[test]
    fn reconnect_resumes_after_last_event() {
        let url = connector("https://horizon.example.test")
            .feed_url(&feed("ledgers"), Some("12884905984"))
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://horizon.example.test/ledgers?cursor=12884905984"
        );
    }

    #[test]
    fn bad_base_url_is_invalid_feed() {
        let err = connector("not a url")
            .feed_url(&feed("ledgers"), None)
            .unwrap_err();

        assert!(matches!(err, PushError::InvalidFeed { .. }));
    }

    #[test]
    fn open_outside_runtime_is_refused() {
        let (tx, _rx) = mpsc::channel(1);

        let err = connector("https://horizon.example.test")
            .open(feed("ledgers"), tx)
            .unwrap_err();

        assert!(matches!(err, PushError::Open { .. }));
    }
}
