//! Core TOML config loading: read from path, string, or platform default.

use crate::schema::DosplayConfig;
use dosplay_common::ConfigError;
use std::path::Path;
use tracing::{debug, info};

use super::paths::{create_default_config, default_config_path};

/// Parse config from TOML text. Missing fields use serde defaults.
pub fn load_from_str(content: &str) -> Result<DosplayConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))
}

/// Read and parse a TOML file. Values are not validated here; see
/// [`crate::load_config_from`].
pub fn load_from_path(path: &Path) -> Result<DosplayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config = load_from_str(&content)?;
    debug!(path = %path.display(), "Config file parsed");
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/dosplay/config.toml`
/// On Linux: `~/.config/dosplay/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<DosplayConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, creating default", path.display());
            create_default_config(&path)?;
            Ok(DosplayConfig::default())
        }
        Err(e) => Err(e),
    }
}
