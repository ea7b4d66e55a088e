//! Pi Client Binary
//!
//! Starts the client, subscribes to the configured ledger feeds and logs
//! every event until shut down.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin pi-client
//! ```
//!
//! # Environment Variables
//!
//! ## Optional
//! - `PI_API_KEY`: Platform API key
//! - `PI_ACCOUNT_ID`: Account records are filtered for
//! - `PI_STREAMS`: Comma-separated feeds to listen to, or `all`
//! - `PI_PLATFORM_URL`: Platform API base URL (default: <https://socialchain.app/>)
//! - `PI_LEDGER_URL`: Ledger API base URL (default: <https://api.testnet.minepi.com>)
//! - `PI_REQUEST_TIMEOUT_MS`: Per-attempt request timeout (default: 20000)
//! - `PI_RETRY_LIMIT`: Retries after a timeout (default: 2)
//! - `PI_HTTP2`: Negotiate HTTP/2 (default: true)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: pi-client)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pi_client::infrastructure::horizon::{HorizonClient, SseConnector};
use pi_client::infrastructure::http::TransportClient;
use pi_client::infrastructure::telemetry;
use pi_client::{ClientConfig, EventHub, PiClient, init_metrics};
use tokio::signal;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Time given to feed tasks to wind down.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Pi client");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics()
        .map_err(|e| tracing::warn!(error = %e, "Metrics recorder not installed"))
        .ok();

    let config = ClientConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Platform API: authenticated with the API key
    let platform = TransportClient::with_reqwest(
        config.platform_base_url.clone(),
        config.credentials.clone(),
        &config.http,
    )
    .context("failed to build platform API client")?;

    // Ledger API: anonymous lookups and event streams
    let ledger = TransportClient::with_reqwest(config.ledger_base_url.clone(), None, &config.http)
        .context("failed to build ledger API client")?;
    let connector =
        SseConnector::from_config(&config).context("failed to build event stream client")?;

    let client = PiClient::new(
        &config,
        Arc::new(platform),
        Arc::new(HorizonClient::new(ledger)),
        Arc::new(connector),
    );

    let logger = tokio::spawn(log_events(client.events(), shutdown_token.clone()));

    client.start();

    await_shutdown(shutdown_token).await;

    let stopped = client.stop_all();
    tracing::info!(stopped, "Streams stopped");

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, logger).await.is_err() {
        tracing::warn!("Event logger did not stop in time");
    }

    tracing::info!("Pi client stopped");
    Ok(())
}

/// Log every client event until cancelled.
///
/// Receivers are subscribed before the returned future is first polled, so no
/// event sent after this call is missed.
fn log_events(
    events: &EventHub,
    shutdown_token: CancellationToken,
) -> impl Future<Output = ()> + Send + 'static {
    let mut ready = events.ready_rx();
    let mut ledgers = events.ledger_rx();
    let mut transactions = events.transaction_rx();
    let mut operations = events.operation_rx();
    let mut payments = events.payment_rx();
    let mut effects = events.effect_rx();
    let mut accounts = events.account_rx();
    let mut offers = events.offer_rx();
    let mut trades = events.trade_rx();
    let mut errors = events.stream_error_rx();

    async move {
        loop {
            tokio::select! {
                () = shutdown_token.cancelled() => break,
                event = ready.recv() => {
                    if on_event(event, |_| tracing::info!("Client ready")) { break; }
                }
                event = ledgers.recv() => {
                    if on_event(event, |ledger| {
                        tracing::info!(sequence = ledger.read().sequence, "ledger");
                    }) { break; }
                }
                event = transactions.recv() => {
                    if on_event(event, |tx| tracing::info!(hash = %tx.read().hash, "transaction")) {
                        break;
                    }
                }
                event = operations.recv() => {
                    if on_event(event, |op| {
                        let op = op.read();
                        tracing::info!(id = %op.id, kind = %op.type_name, "operation");
                    }) { break; }
                }
                event = payments.recv() => {
                    if on_event(event, |op| {
                        let op = op.read();
                        tracing::info!(id = %op.id, kind = %op.type_name, "payment");
                    }) { break; }
                }
                event = effects.recv() => {
                    if on_event(event, |effect| {
                        let effect = effect.read();
                        tracing::info!(id = %effect.id, kind = %effect.type_name, "effect");
                    }) { break; }
                }
                event = accounts.recv() => {
                    if on_event(event, |account| {
                        tracing::info!(id = %account.read().id, "account");
                    }) { break; }
                }
                event = offers.recv() => {
                    if on_event(event, |offer| tracing::info!(id = %offer.read().id, "offer")) {
                        break;
                    }
                }
                event = trades.recv() => {
                    if on_event(event, |trade| tracing::info!(id = %trade.read().id, "trade")) {
                        break;
                    }
                }
                event = errors.recv() => {
                    if on_event(event, |e| {
                        tracing::warn!(category = %e.category, error = %e.message, "streamError");
                    }) { break; }
                }
            }
        }
    }
}

/// Handle one received event. Returns true once the channel is closed.
fn on_event<T>(event: Result<T, broadcast::error::RecvError>, log: impl FnOnce(T)) -> bool {
    match event {
        Ok(event) => {
            log(event);
            false
        }
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "Event logger lagging");
            false
        }
        Err(broadcast::error::RecvError::Closed) => true,
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    let streams: Vec<String> = config
        .subscribed_categories
        .iter()
        .map(ToString::to_string)
        .collect();
    tracing::info!(
        identity = config.identity.as_deref().unwrap_or("-"),
        api_key = config.credentials.is_some(),
        streams = %streams.join(","),
        "Configuration loaded"
    );
    tracing::debug!(
        platform_url = %config.platform_base_url,
        ledger_url = %config.ledger_base_url,
        request_timeout_ms = config.http.request_timeout.as_millis(),
        retry_limit = config.http.retry_limit,
        http2 = config.http.use_multiplexed_transport,
        "API endpoints"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
