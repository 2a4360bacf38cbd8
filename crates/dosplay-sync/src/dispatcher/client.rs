use std::sync::Arc;

use dosplay_common::{PeerId, SessionId, SyncError};
use dosplay_config::SyncConfig;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::state::DispatcherState;
use super::timers::spawn_periodic;
use super::types::{BridgeAction, Outbox, SessionContext, SyncEvent};
use crate::bridge::{DeviceKeyEvent, Engine, InputBridge};
use crate::clock::{Clock, SystemClock};
use crate::peers::PeerStatus;
use crate::protocol::Envelope;
use crate::transport::{InboundPayload, Transport};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// One participant's end of a sync session.
///
/// The dispatcher is the only caller of the [`Transport`]. The host feeds
/// it inbound payloads through [`on_receive`](Self::on_receive) (or
/// [`spawn_receiver`](Self::spawn_receiver)) and starts it once with
/// [`initialize`](Self::initialize).
pub struct Dispatcher {
    config: SyncConfig,
    transport: Arc<dyn Transport>,
    bridge: InputBridge,
    clock: Arc<dyn Clock>,
    state: Mutex<DispatcherState>,
    event_tx: mpsc::Sender<SyncEvent>,
    /// Stops the timers and the receive loop.
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
        engine: Arc<dyn Engine>,
        clock: Arc<dyn Clock>,
    ) -> (Arc<Self>, mpsc::Receiver<SyncEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let dispatcher = Arc::new(Self {
            state: Mutex::new(DispatcherState::new(&config)),
            config,
            transport,
            bridge: InputBridge::new(engine),
            clock,
            event_tx,
            cancel: CancellationToken::new(),
        });
        (dispatcher, event_rx)
    }

    /// Same as [`new`](Self::new) with the wall clock.
    pub fn with_system_clock(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
        engine: Arc<dyn Engine>,
    ) -> (Arc<Self>, mpsc::Receiver<SyncEvent>) {
        Self::new(config, transport, engine, Arc::new(SystemClock))
    }

    pub fn protocol_id(&self) -> &str {
        &self.config.protocol_id
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Host bootstrap. Sends the first `hello`, flushes input captured so
    /// far and starts the heartbeat and prune timers. Later calls are
    /// ignored.
    pub async fn initialize(self: &Arc<Self>, session_id: SessionId, participants: Vec<String>) {
        if session_id.is_empty() {
            warn!("Ignoring initialize with empty session id");
            return;
        }

        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        let Some(outbox) = state.activate(session_id, participants, now) else {
            warn!("Session already initialized, ignoring");
            return;
        };
        self.commit(state, outbox).await;
        self.start_timers();
    }

    fn start_timers(self: &Arc<Self>) {
        spawn_periodic(
            "heartbeat",
            Arc::downgrade(self),
            self.config.heartbeat_interval(),
            self.cancel.clone(),
            |dispatcher| async move { dispatcher.heartbeat_tick().await },
        );
        spawn_periodic(
            "prune",
            Arc::downgrade(self),
            self.config.prune_interval(),
            self.cancel.clone(),
            |dispatcher| async move { dispatcher.prune_tick().await },
        );
        debug!(
            heartbeat_ms = self.config.heartbeat_interval_ms,
            prune = ?self.config.prune_interval(),
            "Timers started"
        );
    }

    /// Host "end session" callback. Stops the timers; everything after this
    /// is ignored.
    pub async fn end_session(&self) {
        self.cancel.cancel();
        let mut state = self.state.lock().await;
        if let Some(outbox) = state.end() {
            self.commit(state, outbox).await;
        }
    }

    // -- Inbound ------------------------------------------------------------

    /// Handle one payload delivered by the host transport.
    pub async fn on_receive(&self, sender: &PeerId, protocol_id: &str, payload: &str) {
        if protocol_id != self.config.protocol_id {
            trace!(protocol_id, "Ignoring payload for another protocol");
            return;
        }

        let envelope = match Envelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(peer = %sender, error = %e, "Dropping undecodable payload");
                return;
            }
        };
        trace!(peer = %sender, kind = envelope.body.kind(), seq = ?envelope.seq, "Envelope received");

        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        let outbox = state.receive(sender, envelope, now);
        self.commit(state, outbox).await;
    }

    /// Feed payloads from `rx` into [`on_receive`](Self::on_receive) until
    /// the channel closes, the session ends or the dispatcher is dropped.
    pub fn spawn_receiver(self: &Arc<Self>, mut rx: mpsc::Receiver<InboundPayload>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let inbound = tokio::select! {
                    _ = cancel.cancelled() => break,
                    inbound = rx.recv() => match inbound {
                        Some(inbound) => inbound,
                        None => break,
                    },
                };
                let Some(dispatcher) = weak.upgrade() else {
                    break;
                };
                dispatcher
                    .on_receive(&inbound.sender, &inbound.protocol_id, &inbound.payload)
                    .await;
            }
            debug!("Receive loop stopped");
        })
    }

    // -- Local input --------------------------------------------------------

    /// Mirror a local key event to every peer. Held in the pre-session
    /// buffer until [`initialize`](Self::initialize). Untrusted events are
    /// ignored.
    pub async fn capture_local_key(&self, event: &DeviceKeyEvent) {
        let Some(payload) = self.bridge.capture_local_key(event) else {
            trace!(key = %event.key, "Ignoring untrusted key event");
            return;
        };
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        let outbox = state.queue_local_key(payload, now);
        self.commit(state, outbox).await;
    }

    /// Load a bundle here, replacing anything running, and announce it to
    /// the session. Before initialization the bundle is loaded but not
    /// announced.
    pub async fn launch(&self, url: &str) -> Result<(), SyncError> {
        if self.state.lock().await.is_ended() {
            return Err(SyncError::SessionEnded);
        }
        self.bridge.load_local(url).await?;
        info!(url, "Bundle launched locally");

        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        let outbox = state.queue_body(self.bridge.relay_launch(url), now);
        self.commit(state, outbox).await;
        Ok(())
    }

    /// Stop the local program. Peers are not told.
    pub async fn stop(&self) -> Result<(), SyncError> {
        self.bridge.stop_local().await
    }

    // -- Timers -------------------------------------------------------------

    pub async fn heartbeat_tick(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        let outbox = state.heartbeat(now);
        self.commit(state, outbox).await;
    }

    pub async fn prune_tick(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        let outbox = state.prune(now);
        self.commit(state, outbox).await;
    }

    // -- Queries ------------------------------------------------------------

    pub async fn status(&self) -> PeerStatus {
        self.state.lock().await.status()
    }

    pub async fn status_text(&self) -> String {
        self.status().await.status_text()
    }

    pub async fn session(&self) -> Option<SessionContext> {
        self.state.lock().await.context().cloned()
    }

    pub async fn peers(&self) -> Vec<PeerId> {
        self.state.lock().await.peers()
    }

    /// Reliable sends not yet acknowledged.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending_count()
    }

    pub async fn buffered_count(&self) -> usize {
        self.state.lock().await.buffered_count()
    }

    // -- Output -------------------------------------------------------------

    /// Transmit under the lock, then run engine actions and emit events
    /// without it.
    async fn commit(&self, state: MutexGuard<'_, DispatcherState>, outbox: Outbox) {
        let Outbox {
            sends,
            actions,
            events,
        } = outbox;

        for envelope in &sends {
            self.transmit(envelope).await;
        }
        drop(state);

        for action in actions {
            self.run_action(action).await;
        }
        for event in events {
            self.emit(event);
        }
    }

    async fn transmit(&self, envelope: &Envelope) {
        let payload = match envelope.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(kind = envelope.body.kind(), error = %e, "Failed to encode envelope");
                return;
            }
        };
        if let Err(e) = self.transport.send(&self.config.protocol_id, payload).await {
            warn!(kind = envelope.body.kind(), seq = ?envelope.seq, error = %e, "Send failed");
        }
    }

    async fn run_action(&self, action: BridgeAction) {
        match action {
            BridgeAction::ReplayKey(payload) => {
                if let Err(e) = self.bridge.replay_remote_key(&payload).await {
                    warn!(key = %payload.key, error = %e, "Key replay failed");
                }
            }
            BridgeAction::RemoteLaunch(url) => {
                let accepted = match self.bridge.on_remote_launch(&url).await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(url, error = %e, "Remote launch failed");
                        false
                    }
                };
                if accepted {
                    info!(url, "Joined remote bundle");
                }
                self.emit(SyncEvent::RemoteLaunch { url, accepted });
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            debug!(error = %e, "Sync event dropped");
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
