//! Configuration Module
//!
//! Configuration loading for the Pi client.

mod settings;

pub use settings::{
    ClientConfig, ConfigError, Credentials, DEFAULT_LEDGER_URL, DEFAULT_PLATFORM_URL,
    EventSettings, HttpSettings, StreamSettings,
};
