pub mod errors;
pub mod id;

pub use errors::{ConfigError, DosplayError, SyncError};
pub use id::{new_id, PeerId, SessionId};

pub type Result<T> = std::result::Result<T, DosplayError>;
