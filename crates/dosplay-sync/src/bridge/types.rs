//! Key event shapes on either side of the bridge.

use crate::protocol::Modifiers;

/// A key event as reported by the local input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceKeyEvent {
    pub key: String,
    pub code: String,
    pub key_code: u32,
    /// `true` for press, `false` for release.
    pub pressed: bool,
    pub modifiers: Modifiers,
    pub repeat: bool,
    /// Set by the device layer for real user input. Events the bridge
    /// itself injected arrive untrusted and must not be mirrored again.
    pub trusted: bool,
}

impl DeviceKeyEvent {
    pub fn press(key: impl Into<String>, code: impl Into<String>, key_code: u32) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            key_code,
            pressed: true,
            modifiers: Modifiers::default(),
            repeat: false,
            trusted: true,
        }
    }

    pub fn release(key: impl Into<String>, code: impl Into<String>, key_code: u32) -> Self {
        Self {
            pressed: false,
            ..Self::press(key, code, key_code)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    KeyDown,
    KeyPress,
    KeyUp,
}

/// An event injected into the engine on behalf of a remote participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticKeyEvent {
    pub kind: KeyEventKind,
    pub key: String,
    pub code: String,
    pub key_code: u32,
    pub modifiers: Modifiers,
    pub repeat: bool,
    /// Always `false`; keeps replayed input from being captured and sent
    /// back out.
    pub trusted: bool,
}
