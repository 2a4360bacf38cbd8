use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures inside the sync protocol. None of these are fatal to the host:
/// the dispatcher logs them and keeps its timers running.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("session has ended")]
    SessionEnded,
}

#[derive(Debug, thiserror::Error)]
pub enum DosplayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
