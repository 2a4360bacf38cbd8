//! Session sync protocol for shared DOS sessions.
//!
//! Participants exchange JSON envelopes over a host-provided, best-effort
//! broadcast channel. This crate keeps them in step: local key input is
//! mirrored to every peer, a loaded bundle is announced so others can join,
//! and heartbeats keep a registry of reachable peers.
//!
//! The [`Dispatcher`] is the only component that talks to the
//! [`Transport`]; everything else (dedup, registry, pending ledger,
//! pre-session buffer) is state it owns behind one lock.

pub mod bridge;
pub mod clock;
pub mod dedup;
pub mod dispatcher;
pub mod input_buffer;
pub mod peers;
pub mod pending;
pub mod protocol;
pub mod sequence;
pub mod transport;

pub use bridge::{
    DeviceKeyEvent, Engine, HeadlessEngine, InputBridge, KeyEventKind, SyntheticKeyEvent,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dedup::DedupCache;
pub use dispatcher::{parse_participants, Dispatcher, SessionContext, SyncEvent};
pub use input_buffer::InputBuffer;
pub use peers::{PeerRegistry, PeerStatus};
pub use pending::{PendingLedger, PendingSend};
pub use protocol::{Body, Envelope, KeyAction, KeyPayload, Modifiers};
pub use sequence::SequenceAllocator;
pub use transport::{InboundPayload, MemoryEndpoint, MemoryHub, Transport};
