//! The protocol dispatcher: session lifecycle, routing of inbound
//! envelopes, and the heartbeat and prune timers.
//!
//! All protocol state sits in one `DispatcherState` behind a single lock.
//! A call computes its sends, engine actions and UI events under that lock;
//! sends are handed to the transport before the lock is released so wire
//! order follows `seq` order. Engine work and event delivery happen after.

mod client;
mod state;
mod timers;
mod types;


pub use client::Dispatcher;
pub use types::{parse_participants, SessionContext, SyncEvent};
