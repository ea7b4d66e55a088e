//! Client Configuration Settings
//!
//! Configuration types for the Pi client, loaded from environment variables.

use std::time::Duration;

use crate::domain::subscription::{StreamCategory, parse_categories};

/// Default platform API base URL.
pub const DEFAULT_PLATFORM_URL: &str = "https://socialchain.app/";

/// Default ledger API base URL.
pub const DEFAULT_LEDGER_URL: &str = "https://api.testnet.minepi.com";

/// Platform API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_key: String) -> Self {
        Self { api_key }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Outbound HTTP settings, fixed for the lifetime of a client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
    /// Retries after a timed out attempt.
    pub retry_limit: u32,
    /// Prefer a multiplexed (HTTP/2) connection.
    pub use_multiplexed_transport: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(20_000),
            retry_limit: 2,
            use_multiplexed_transport: true,
        }
    }
}

/// Push feed reconnection settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_initial: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            max_reconnect_attempts: 0, // Unlimited
        }
    }
}

/// Event channel settings.
#[derive(Debug, Clone)]
pub struct EventSettings {
    /// Capacity of each event channel.
    pub capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Platform API base URL.
    pub platform_base_url: String,
    /// Ledger API base URL.
    pub ledger_base_url: String,
    /// Platform API credentials, if any.
    pub credentials: Option<Credentials>,
    /// Account id records are filtered for, if any.
    pub identity: Option<String>,
    /// Stream categories started with the client.
    pub subscribed_categories: Vec<StreamCategory>,
    /// Outbound HTTP settings.
    pub http: HttpSettings,
    /// Push feed settings.
    pub stream: StreamSettings,
    /// Event channel settings.
    pub events: EventSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            platform_base_url: DEFAULT_PLATFORM_URL.to_string(),
            ledger_base_url: DEFAULT_LEDGER_URL.to_string(),
            credentials: None,
            identity: None,
            subscribed_categories: Vec::new(),
            http: HttpSettings::default(),
            stream: StreamSettings::default(),
            events: EventSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an empty or invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from any variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an empty or invalid value.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let credentials = match env("PI_API_KEY") {
            Some(key) if key.trim().is_empty() => {
                return Err(ConfigError::EmptyValue("PI_API_KEY".to_string()));
            }
            Some(key) => Some(Credentials::new(key)),
            None => None,
        };

        let identity = env("PI_ACCOUNT_ID")
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let subscribed_categories = match env("PI_STREAMS") {
            Some(list) => parse_categories(&list).map_err(|e| ConfigError::InvalidValue {
                key: "PI_STREAMS".to_string(),
                message: e.to_string(),
            })?,
            None => Vec::new(),
        };

        let platform_base_url = parse_url(&env, "PI_PLATFORM_URL", DEFAULT_PLATFORM_URL)?;
        let ledger_base_url = parse_url(&env, "PI_LEDGER_URL", DEFAULT_LEDGER_URL)?;

        let http = HttpSettings {
            request_timeout: parse_env_duration_millis(
                &env,
                "PI_REQUEST_TIMEOUT_MS",
                HttpSettings::default().request_timeout,
            ),
            retry_limit: parse_env(&env, "PI_RETRY_LIMIT", HttpSettings::default().retry_limit),
            use_multiplexed_transport: parse_env_bool(
                &env,
                "PI_HTTP2",
                HttpSettings::default().use_multiplexed_transport,
            ),
        };

        let stream = StreamSettings {
            reconnect_delay_initial: parse_env_duration_millis(
                &env,
                "PI_STREAM_RECONNECT_DELAY_INITIAL_MS",
                StreamSettings::default().reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                &env,
                "PI_STREAM_RECONNECT_DELAY_MAX_SECS",
                StreamSettings::default().reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_env(
                &env,
                "PI_STREAM_RECONNECT_DELAY_MULTIPLIER",
                StreamSettings::default().reconnect_delay_multiplier,
            ),
            max_reconnect_attempts: parse_env(
                &env,
                "PI_STREAM_RECONNECT_MAX_ATTEMPTS",
                StreamSettings::default().max_reconnect_attempts,
            ),
        };

        let events = EventSettings {
            capacity: parse_env(&env, "PI_EVENT_CAPACITY", EventSettings::default().capacity),
        };

        Ok(Self {
            platform_base_url,
            ledger_base_url,
            credentials,
            identity,
            subscribed_categories,
            http,
            stream,
            events,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has a value that cannot be used.
    #[error("environment variable {key} is invalid: {message}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// What is wrong with it.
        message: String,
    },
}

fn parse_url(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<String, ConfigError> {
    let Some(url) = env(key) else {
        return Ok(default.to_string());
    };
    let url = url.trim();
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match host {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(url.to_string()),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{url}' is not an http(s) URL"),
        }),
    }
}

fn parse_env<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    env(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_env_bool(env: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    env(key).map_or(default, |v| {
        matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

fn parse_env_duration_secs(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    env(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    env(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
