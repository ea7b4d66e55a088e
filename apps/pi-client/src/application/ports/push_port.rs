//! Push Feed Port (Driven Port)
//!
//! Interface for opening a server-push feed of ledger records. The adapter
//! owns the connection, including reconnects, and forwards what it receives
//! into an mpsc channel until its handle is closed.

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::subscription::StreamCategory;

/// Feed to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    /// Category being listened to.
    pub category: StreamCategory,
    /// Path relative to the ledger base URL.
    pub path: String,
    /// Starting cursor.
    pub cursor: String,
}

impl FeedRequest {
    /// Cursor meaning "only records produced from now on".
    pub const CURSOR_NOW: &'static str = "now";
}

/// Item delivered by an open feed.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    /// One JSON record.
    Record(Value),
    /// A non-fatal feed error. The feed stays open.
    Error(String),
}

/// Handle to an open feed. Closing or dropping it ends the feed.
#[derive(Debug)]
pub struct PushHandle {
    cancel: CancellationToken,
}

impl PushHandle {
    /// Wrap the token the feed task watches.
    #[must_use]
    pub const fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// End the feed.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether the feed was ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PushHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Feed could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// The feed URL could not be built.
    #[error("invalid feed: {message}")]
    InvalidFeed {
        /// Error details.
        message: String,
    },

    /// The connector refused to open the feed.
    #[error("failed to open feed: {message}")]
    Open {
        /// Error details.
        message: String,
    },
}

/// Port for opening push feeds.
///
/// `open` must not block: it starts the feed and returns its handle.
/// Connection failures after that point are reported as
/// [`PushMessage::Error`].
pub trait PushConnector: Send + Sync {
    /// Open a feed delivering into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error when the feed cannot be started at all.
    fn open(
        &self,
        feed: FeedRequest,
        sink: mpsc::Sender<PushMessage>,
    ) -> Result<PushHandle, PushError>;
}
