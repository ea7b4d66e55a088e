//! Event Stream Integration Tests
//!
//! Runs the server-sent events connector against a local mock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pi_client::StreamCategory;
use pi_client::application::ports::{FeedRequest, PushConnector, PushMessage};
use pi_client::infrastructure::horizon::{BackoffConfig, SseConnector};

fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        multiplier: 2.0,
        jitter_factor: 0.0,
        max_attempts: 0,
    }
}

fn event_stream(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

async fn next(rx: &mut mpsc::Receiver<PushMessage>) -> PushMessage {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("message within two seconds")
        .expect("feed open")
}

#[tokio::test]
async fn test_records_flow_and_reconnect_resumes_from_last_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ledgers"))
        .and(query_param("cursor", "now"))
        .and(header("accept", "text/event-stream"))
        .respond_with(event_stream(concat!(
            "retry: 1000\n",
            "event: open\n",
            "data: \"hello\"\n\n",
            ": keep-alive\n\n",
            "id: 10\n",
            "data: {\"id\":\"l10\",\"sequence\":10}\n\n",
            "id: 11\r\n",
            "data: {\"id\":\"l11\",\r\n",
            "data: \"sequence\":11}\r\n\r\n",
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ledgers"))
        .and(query_param("cursor", "11"))
        .and(header("last-event-id", "11"))
        .respond_with(event_stream(
            "id: 12\ndata: {\"id\":\"l12\",\"sequence\":12}\n\n",
        ))
        .mount(&server)
        .await;

    let connector = SseConnector::new(reqwest::Client::new(), server.uri(), fast_backoff());
    let (tx, mut rx) = mpsc::channel(16);
    let handle = connector
        .open(
            FeedRequest {
                category: StreamCategory::Ledgers,
                path: "ledgers".to_string(),
                cursor: FeedRequest::CURSOR_NOW.to_string(),
            },
            tx,
        )
        .unwrap();

    assert_eq!(
        next(&mut rx).await,
        PushMessage::Record(json!({"id": "l10", "sequence": 10}))
    );
    assert_eq!(
        next(&mut rx).await,
        PushMessage::Record(json!({"id": "l11", "sequence": 11}))
    );
    assert_eq!(
        next(&mut rx).await,
        PushMessage::Error("feed closed by server".to_string())
    );
    assert_eq!(
        next(&mut rx).await,
        PushMessage::Record(json!({"id": "l12", "sequence": 12}))
    );

    handle.close();
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_refused_feed_reports_status_and_gives_up_after_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/GME/payments"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let backoff = BackoffConfig {
        max_attempts: 1,
        ..fast_backoff()
    };
    let connector = SseConnector::new(reqwest::Client::new(), server.uri(), backoff);
    let (tx, mut rx) = mpsc::channel(16);
    let _handle = connector
        .open(
            FeedRequest {
                category: StreamCategory::Payments,
                path: "accounts/GME/payments".to_string(),
                cursor: FeedRequest::CURSOR_NOW.to_string(),
            },
            tx,
        )
        .unwrap();

    let refused = PushMessage::Error("feed responded with status 403".to_string());
    assert_eq!(next(&mut rx).await, refused);
    assert_eq!(next(&mut rx).await, refused);
    assert_eq!(
        next(&mut rx).await,
        PushMessage::Error("maximum reconnection attempts exceeded".to_string())
    );
    assert!(
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("feed task ends")
            .is_none()
    );
}
