//! Configuration schema types for dosplay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod sync;
mod system;

pub use sync::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DosplayConfig {
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}
