//! HTTP Transport Integration Tests
//!
//! Runs the reqwest-backed transport client and the Horizon lookup client
//! against a local mock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pi_client::application::ports::{HttpMethod, LedgerApi, PlatformApi};
use pi_client::infrastructure::http::RequestOptions;
use pi_client::{
    Credentials, HorizonClient, HttpSettings, RequestError, ReqwestTransport, TransportClient,
    TransportError,
};

fn settings(timeout_ms: u64, retry_limit: u32) -> HttpSettings {
    HttpSettings {
        request_timeout: Duration::from_millis(timeout_ms),
        retry_limit,
        use_multiplexed_transport: false,
    }
}

fn client(server: &MockServer, settings: &HttpSettings) -> TransportClient {
    TransportClient::new(
        server.uri(),
        Some(Credentials::new("secret-key".to_string())),
        settings,
        Arc::new(ReqwestTransport::new(settings.use_multiplexed_transport).unwrap()),
    )
}

#[tokio::test]
async fn test_platform_call_sends_key_and_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/payments/pay-1/complete"))
        .and(header("authorization", "Key secret-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"txid": "abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"identifier": "pay-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server, &settings(2_000, 2))
        .call(
            HttpMethod::Post,
            "/v2/payments/pay-1/complete",
            Some(json!({"txid": "abc"})),
        )
        .await
        .unwrap();

    assert_eq!(body, Some(json!({"identifier": "pay-1"})));
}

#[tokio::test]
async fn test_non_json_body_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let body = client(&server, &settings(2_000, 2))
        .request(HttpMethod::Get, "health", None, RequestOptions::anonymous())
        .await
        .unwrap();

    assert_eq!(body, None);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, &settings(2_000, 2))
        .call(HttpMethod::Get, "v2/me", None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RequestError::Transport(TransportError::Status {
            status: 500,
            body: "boom".to_string(),
        })
    );
}

#[tokio::test]
async fn test_timeout_is_retried_up_to_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server, &settings(100, 1))
        .call(HttpMethod::Get, "v2/me", None)
        .await
        .unwrap_err();

    assert_eq!(err, RequestError::Timeout { attempts: 2 });
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, &settings(2_000, 0))
        .call(HttpMethod::Get, "old", None)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(302));
}

#[tokio::test]
async fn test_horizon_lookup_is_anonymous_and_maps_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets"))
        .and(query_param("asset_code", "PIE"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                r#"{"_embedded":{"records":[{"asset_code":"PIE"}]}}"#,
                "application/hal+json; charset=utf-8",
            ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/GNONE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": 404})))
        .mount(&server)
        .await;

    let horizon = HorizonClient::new(client(&server, &settings(2_000, 2)));

    let page = horizon
        .get("assets", &[("asset_code", "PIE")])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page["_embedded"]["records"][0]["asset_code"], "PIE");
    assert_eq!(horizon.get("accounts/GNONE", &[]).await, Ok(None));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.headers.contains_key("authorization")));
}
