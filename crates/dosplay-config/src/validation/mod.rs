//! Full configuration validation.
//!
//! Each section has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod sync;


use crate::schema::DosplayConfig;
use dosplay_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &DosplayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sync::validate_sync(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
