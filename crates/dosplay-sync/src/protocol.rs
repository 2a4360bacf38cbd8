//! Wire types for the session sync protocol.
//!
//! Every payload handed to the transport is one JSON object:
//!
//! ```json
//! {"type":"key","sessionId":"s-1","sentAt":1718000000000,"seq":7,
//!  "action":"down","key":"a","code":"KeyA","keyCode":65,"modifiers":{"shift":true}}
//! ```
//!
//! The `type` tag selects the [`Body`] variant; unknown tags decode to
//! [`Body::Unknown`] so newer peers can add message types without breaking
//! older ones.

use dosplay_common::{SessionId, SyncError};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Sender's session id. Missing only on envelopes from hosts that do not
    /// stamp one; dedup then falls back to the transport sender tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Sender wall clock, epoch milliseconds.
    #[serde(default)]
    pub sent_at: u64,
    /// Present only on reliable types (`key`, `launch`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(flatten)]
    pub body: Body,
}

impl Envelope {
    pub fn encode(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(raw)?)
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Type-specific part of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Body {
    /// Liveness beacon; also sent once on session start.
    Hello,
    /// Reply to a `hello`.
    HelloAck,
    /// Acknowledges a reliable envelope.
    Ack {
        acked: u64,
        /// Session the ack is meant for. Acks naming another session are
        /// ignored, since the channel is a broadcast.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<SessionId>,
    },
    /// A mirrored key press or release.
    Key(KeyPayload),
    /// Announces the bundle loaded by the sender.
    Launch { url: String },
    /// Any `type` this build does not know.
    #[serde(other)]
    Unknown,
}

impl Body {
    /// Reliable types carry a `seq` and are acknowledged.
    pub fn is_reliable(&self) -> bool {
        matches!(self, Self::Key(_) | Self::Launch { .. })
    }

    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::HelloAck => "hello_ack",
            Self::Ack { .. } => "ack",
            Self::Key(_) => "key",
            Self::Launch { .. } => "launch",
            Self::Unknown => "unknown",
        }
    }
}

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Down,
    Up,
}

/// Modifier flags held during a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.meta)
    }
}

/// Payload of a `key` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPayload {
    pub action: KeyAction,
    /// Logical key value, e.g. `"a"`, `"Enter"`, `"ArrowLeft"`.
    pub key: String,
    /// Physical key code, e.g. `"KeyA"`.
    #[serde(default)]
    pub code: String,
    /// Legacy numeric key code; DOS emulators still map from it.
    #[serde(default)]
    pub key_code: u32,
    #[serde(default, skip_serializing_if = "Modifiers::is_empty")]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub repeat: bool,
}

// =============================================================================
// Tests
// =============================================================================
