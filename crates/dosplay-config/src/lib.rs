//! dosplay configuration system.
//!
//! TOML-based configuration for the sync protocol timing, cache sizes and
//! logging. All sections use `serde(default)` so a partial file (or no file
//! at all) yields the reference protocol values.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dosplay_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{DosplayConfig, LogLevel, LoggingConfig, SyncConfig, CONFIG_SCHEMA_VERSION};

use std::path::Path;

use dosplay_common::ConfigError;
use tracing::info;

/// Load config from the platform default path and validate it.
pub fn load_config() -> Result<DosplayConfig, ConfigError> {
    load_config_from(None)
}

/// Load config from `path`, or from the platform default path (created on
/// first run) when `None`, and validate it. Invalid values are an error;
/// they are never silently replaced.
pub fn load_config_from(path: Option<&Path>) -> Result<DosplayConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };
    validation::validate(&config)?;
    info!(
        heartbeat_ms = config.sync.heartbeat_interval_ms,
        peer_timeout_ms = config.sync.peer_timeout_ms,
        "Config loaded"
    );
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &DosplayConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
