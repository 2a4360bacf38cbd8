//! Protocol state machine.
//!
//! Every method takes the current time and returns an [`Outbox`] instead of
//! doing I/O, so the whole protocol can be driven deterministically.

use dosplay_common::{PeerId, SessionId};
use dosplay_config::SyncConfig;
use tracing::{debug, info, trace, warn};

use super::types::{BridgeAction, Outbox, Phase, SessionContext, SyncEvent};
use crate::dedup::DedupCache;
use crate::input_buffer::InputBuffer;
use crate::peers::{PeerRegistry, PeerStatus};
use crate::pending::{PendingLedger, PendingSend};
use crate::protocol::{Body, Envelope, KeyPayload};
use crate::sequence::SequenceAllocator;

/// All mutable protocol state, kept under one lock by the dispatcher.
pub(crate) struct DispatcherState {
    config: SyncConfig,
    phase: Phase,
    sequence: SequenceAllocator,
    dedup: DedupCache,
    peers: PeerRegistry,
    pending: PendingLedger,
    buffer: InputBuffer<KeyPayload>,
    last_status: PeerStatus,
}

impl DispatcherState {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            config: config.clone(),
            phase: Phase::Uninitialized,
            sequence: SequenceAllocator::new(),
            dedup: DedupCache::new(config.dedup_capacity),
            peers: PeerRegistry::new(),
            pending: PendingLedger::new(config.max_pending),
            buffer: InputBuffer::new(config.input_buffer_capacity),
            last_status: PeerStatus::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.phase, Phase::Ended)
    }

    pub fn context(&self) -> Option<&SessionContext> {
        match &self.phase {
            Phase::Active(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.context().map(|ctx| &ctx.local_session_id)
    }

    pub fn status(&self) -> PeerStatus {
        PeerStatus {
            peer_count: self.peers.count(),
            active: self.is_active(),
        }
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.peers.peers()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn buffered_count(&self) -> usize {
        self.buffer.len()
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Enter the active phase: announce ourselves, flush buffered input in
    /// order, then prune once. Returns `None` unless uninitialized.
    pub fn activate(
        &mut self,
        session_id: SessionId,
        participants: Vec<String>,
        now: u64,
    ) -> Option<Outbox> {
        if !matches!(self.phase, Phase::Uninitialized) {
            return None;
        }

        info!(
            session_id = %session_id,
            participants = participants.len(),
            "Session initialized"
        );
        self.phase = Phase::Active(SessionContext {
            local_session_id: session_id.clone(),
            participants: participants.clone(),
        });

        let mut out = Outbox::default();
        out.events.push(SyncEvent::Activated {
            session_id,
            participants,
        });
        self.stamp(Body::Hello, now, &mut out);

        let buffered = self.buffer.flush_in_order();
        if !buffered.is_empty() {
            debug!(count = buffered.len(), "Flushing pre-session input");
        }
        for payload in buffered {
            self.stamp(Body::Key(payload), now, &mut out);
        }

        self.prune_into(now, &mut out);
        Some(out)
    }

    /// Enter the terminal phase. Peers are forgotten and buffered input is
    /// discarded. Returns `None` if already ended.
    pub fn end(&mut self) -> Option<Outbox> {
        if self.is_ended() {
            return None;
        }
        if let Some(session_id) = self.session_id() {
            info!(session_id = %session_id, "Session ended");
        }
        self.phase = Phase::Ended;
        self.buffer.flush_in_order();
        self.peers = PeerRegistry::new();

        let mut out = Outbox::default();
        self.refresh_status(&mut out);
        Some(out)
    }

    // -- Outbound -----------------------------------------------------------

    /// Attach session id, timestamp and (for reliable types) a fresh seq.
    /// Reliable envelopes are recorded in the pending ledger.
    fn stamp(&mut self, body: Body, now: u64, out: &mut Outbox) {
        let Phase::Active(ctx) = &self.phase else {
            return;
        };
        let session_id = Some(ctx.local_session_id.clone());
        let seq = body.is_reliable().then(|| self.sequence.next_seq());

        let envelope = Envelope {
            session_id,
            sent_at: now,
            seq,
            body,
        };
        if let Some(seq) = seq {
            self.pending.record(PendingSend {
                seq,
                envelope: envelope.clone(),
                sent_at: now,
            });
        }
        out.sends.push(envelope);
    }

    /// Send a captured local key, or hold it until the session starts.
    pub fn queue_local_key(&mut self, payload: KeyPayload, now: u64) -> Outbox {
        let mut out = Outbox::default();
        match self.phase {
            Phase::Uninitialized => {
                if let Some(dropped) = self.buffer.push(payload) {
                    debug!(key = %dropped.key, "Input buffer full, dropped oldest");
                }
            }
            Phase::Active(_) => self.stamp(Body::Key(payload), now, &mut out),
            Phase::Ended => debug!("Session ended, ignoring local key"),
        }
        out
    }

    /// Send any body on behalf of the local participant. Dropped outside
    /// the active phase.
    pub fn queue_body(&mut self, body: Body, now: u64) -> Outbox {
        let mut out = Outbox::default();
        if self.is_active() {
            self.stamp(body, now, &mut out);
        } else {
            debug!(kind = body.kind(), "No active session, not sending");
        }
        out
    }

    pub fn heartbeat(&mut self, now: u64) -> Outbox {
        let mut out = Outbox::default();
        self.stamp(Body::Hello, now, &mut out);
        out
    }

    // -- Inbound ------------------------------------------------------------

    pub fn receive(&mut self, sender: &PeerId, envelope: Envelope, now: u64) -> Outbox {
        let mut out = Outbox::default();

        let local = match &self.phase {
            Phase::Active(ctx) => ctx.local_session_id.clone(),
            _ => {
                debug!(%sender, kind = envelope.body.kind(), "No active session, dropping envelope");
                return out;
            }
        };

        if envelope.session_id.as_ref() == Some(&local) {
            trace!(kind = envelope.body.kind(), "Dropping own envelope");
            return out;
        }

        if self.peers.mark_seen(sender, now) {
            info!(peer = %sender, "Peer joined");
            out.events.push(SyncEvent::PeerJoined {
                peer: sender.clone(),
            });
            self.refresh_status(&mut out);
        }

        let dedup_key = envelope
            .session_id
            .as_ref()
            .map_or(sender.as_str(), SessionId::as_str)
            .to_string();

        match envelope.body {
            Body::Hello => self.stamp(Body::HelloAck, now, &mut out),
            Body::HelloAck => {}
            Body::Ack { acked, target } => {
                if target.as_ref().is_some_and(|t| *t != local) {
                    trace!(acked, "Ack for another session");
                } else if self.pending.acknowledge(acked) {
                    debug!(acked, peer = %sender, "Send acknowledged");
                } else {
                    trace!(acked, "Unmatched ack");
                }
            }
            Body::Key(payload) => match envelope.seq {
                Some(seq) => {
                    self.ack(seq, envelope.session_id, now, &mut out);
                    if self.dedup.check_and_mark(&dedup_key, seq) {
                        out.actions.push(BridgeAction::ReplayKey(payload));
                    } else {
                        debug!(seq, sender = %dedup_key, "Duplicate key dropped");
                    }
                }
                None => out.actions.push(BridgeAction::ReplayKey(payload)),
            },
            Body::Launch { url } => match envelope.seq {
                Some(seq) => {
                    self.ack(seq, envelope.session_id, now, &mut out);
                    if self.dedup.check_and_mark(&dedup_key, seq) {
                        out.actions.push(BridgeAction::RemoteLaunch(url));
                    } else {
                        debug!(seq, sender = %dedup_key, "Duplicate launch dropped");
                    }
                }
                None => out.actions.push(BridgeAction::RemoteLaunch(url)),
            },
            Body::Unknown => {
                warn!(peer = %sender, "Ignoring envelope of unknown type");
            }
        }
        out
    }

    /// Acks go out before the dedup check, so a duplicate still gets one.
    /// The sender may be waiting on exactly that ack.
    fn ack(&mut self, seq: u64, target: Option<SessionId>, now: u64, out: &mut Outbox) {
        self.stamp(Body::Ack { acked: seq, target }, now, out);
    }

    // -- Liveness -----------------------------------------------------------

    pub fn prune(&mut self, now: u64) -> Outbox {
        let mut out = Outbox::default();
        self.prune_into(now, &mut out);
        out
    }

    fn prune_into(&mut self, now: u64, out: &mut Outbox) {
        let removed = self.peers.prune(now, self.config.peer_timeout());
        if !removed.is_empty() {
            info!(count = removed.len(), "Pruned silent peers");
            out.events.push(SyncEvent::PeersPruned { peers: removed });
        }
        self.refresh_status(out);
    }

    fn refresh_status(&mut self, out: &mut Outbox) {
        let status = self.status();
        if status != self.last_status {
            self.last_status = status;
            out.events.push(SyncEvent::StatusChanged(status));
        }
    }
}
