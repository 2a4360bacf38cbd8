//! Session phases, events and the per-call outbox.

use dosplay_common::{PeerId, SessionId};

use crate::peers::PeerStatus;
use crate::protocol::{Envelope, KeyPayload};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What the host told us when the session started. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub local_session_id: SessionId,
    /// Participant addresses as supplied by the host.
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Phase {
    Uninitialized,
    Active(SessionContext),
    Ended,
}

/// Split the host's comma-separated participant list. Entries are trimmed
/// and empty entries dropped.
pub fn parse_participants(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Notifications for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The host started the session.
    Activated {
        session_id: SessionId,
        participants: Vec<String>,
    },
    /// First envelope from a peer not currently registered.
    PeerJoined { peer: PeerId },
    /// Peers evicted by a prune pass.
    PeersPruned { peers: Vec<PeerId> },
    StatusChanged(PeerStatus),
    /// A peer announced a bundle. `accepted` is false when something was
    /// already running here or the engine refused it.
    RemoteLaunch { url: String, accepted: bool },
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Work for the engine, performed after the state lock is released.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BridgeAction {
    ReplayKey(KeyPayload),
    RemoteLaunch(String),
}

/// Everything one state transition wants done outside the state itself.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    pub sends: Vec<Envelope>,
    pub actions: Vec<BridgeAction>,
    pub events: Vec<SyncEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_participant_list() {
        assert_eq!(
            parse_participants(" alice, bob ,,carol "),
            vec!["alice", "bob", "carol"]
        );
        assert!(parse_participants("").is_empty());
        assert!(parse_participants(" , ").is_empty());
    }
}
