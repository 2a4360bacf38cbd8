//! Glue between local devices, the wire protocol and the execution engine.
//!
//! Outbound, trusted device key events become [`KeyPayload`]s and bundle
//! loads become `launch` bodies. Inbound, mirrored keys are replayed into
//! the engine as synthetic events and remote launches are honored only when
//! nothing is running locally.
//!
//! [`KeyPayload`]: crate::protocol::KeyPayload

mod engine;
mod input;
mod types;

pub use engine::{Engine, HeadlessEngine};
pub use input::InputBridge;
pub use types::{DeviceKeyEvent, KeyEventKind, SyntheticKeyEvent};
