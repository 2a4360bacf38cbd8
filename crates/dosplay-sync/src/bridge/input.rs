//! Translation between device events, envelopes and engine calls.

use std::sync::Arc;

use dosplay_common::SyncError;
use tokio::sync::Mutex;
use tracing::debug;

use super::engine::Engine;
use super::types::{DeviceKeyEvent, KeyEventKind, SyntheticKeyEvent};
use crate::protocol::{Body, KeyAction, KeyPayload, Modifiers};

pub struct InputBridge {
    engine: Arc<dyn Engine>,
    /// Held across every is-loaded check and the load or stop that follows,
    /// so overlapping launches see each other's result.
    launch_gate: Mutex<()>,
}

impl InputBridge {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            launch_gate: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Turn a device event into a mirrorable payload. Untrusted events are
    /// ones this bridge injected itself and yield `None`.
    pub fn capture_local_key(&self, event: &DeviceKeyEvent) -> Option<KeyPayload> {
        if !event.trusted {
            return None;
        }
        Some(KeyPayload {
            action: if event.pressed {
                KeyAction::Down
            } else {
                KeyAction::Up
            },
            key: event.key.clone(),
            code: event.code.clone(),
            key_code: event.key_code,
            modifiers: event.modifiers,
            repeat: event.repeat,
        })
    }

    /// Inject a remote key into the engine.
    ///
    /// A press becomes key-down (with modifiers and repeat) followed by an
    /// unmodified key-press; DOS keyboard handlers read characters from the
    /// latter. A release becomes a single key-up.
    pub async fn replay_remote_key(&self, payload: &KeyPayload) -> Result<(), SyncError> {
        match payload.action {
            KeyAction::Down => {
                let down = synthetic(
                    KeyEventKind::KeyDown,
                    payload,
                    payload.modifiers,
                    payload.repeat,
                );
                let press = synthetic(KeyEventKind::KeyPress, payload, Modifiers::default(), false);
                self.engine.dispatch_key(down).await?;
                self.engine.dispatch_key(press).await
            }
            KeyAction::Up => {
                let up = synthetic(KeyEventKind::KeyUp, payload, payload.modifiers, false);
                self.engine.dispatch_key(up).await
            }
        }
    }

    /// Body announcing a locally loaded bundle.
    pub fn relay_launch(&self, url: &str) -> Body {
        Body::Launch {
            url: url.to_string(),
        }
    }

    /// Load a bundle announced by a peer, unless something is already
    /// running here. Returns whether the bundle was loaded.
    pub async fn on_remote_launch(&self, url: &str) -> Result<bool, SyncError> {
        check_url(url)?;
        let _gate = self.launch_gate.lock().await;
        if self.engine.is_loaded().await {
            debug!(url, "Program already running, ignoring remote launch");
            return Ok(false);
        }
        self.engine.load(url).await?;
        Ok(true)
    }

    /// Load a bundle chosen locally, replacing whatever is running.
    pub async fn load_local(&self, url: &str) -> Result<(), SyncError> {
        check_url(url)?;
        let _gate = self.launch_gate.lock().await;
        if self.engine.is_loaded().await {
            self.engine.stop().await?;
        }
        self.engine.load(url).await
    }

    pub async fn stop_local(&self) -> Result<(), SyncError> {
        let _gate = self.launch_gate.lock().await;
        self.engine.stop().await
    }
}

fn check_url(url: &str) -> Result<(), SyncError> {
    if url.trim().is_empty() {
        return Err(SyncError::Protocol("launch with empty url".into()));
    }
    Ok(())
}

fn synthetic(
    kind: KeyEventKind,
    payload: &KeyPayload,
    modifiers: Modifiers,
    repeat: bool,
) -> SyntheticKeyEvent {
    SyntheticKeyEvent {
        kind,
        key: payload.key.clone(),
        code: payload.code.clone(),
        key_code: payload.key_code,
        modifiers,
        repeat,
        trusted: false,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bridge::HeadlessEngine;

    fn bridge() -> (InputBridge, Arc<HeadlessEngine>) {
        let engine = Arc::new(HeadlessEngine::new());
        (InputBridge::new(engine.clone()), engine)
    }

    #[test]
    fn capture_maps_trusted_events() {
        let (bridge, _) = bridge();
        let mut event = DeviceKeyEvent::press("A", "KeyA", 65);
        event.modifiers.shift = true;
        let payload = bridge.capture_local_key(&event).unwrap();
        assert_eq!(payload.action, KeyAction::Down);
        assert_eq!(payload.key, "A");
        assert_eq!(payload.key_code, 65);
        assert!(payload.modifiers.shift);

        let payload = bridge
            .capture_local_key(&DeviceKeyEvent::release("A", "KeyA", 65))
            .unwrap();
        assert_eq!(payload.action, KeyAction::Up);
    }

    #[test]
    fn capture_ignores_untrusted_events() {
        let (bridge, _) = bridge();
        let mut event = DeviceKeyEvent::press("a", "KeyA", 65);
        event.trusted = false;
        assert!(bridge.capture_local_key(&event).is_none());
    }

    #[tokio::test]
    async fn key_down_replays_down_then_unmodified_press() {
        let (bridge, engine) = bridge();
        let payload = KeyPayload {
            action: KeyAction::Down,
            key: "a".into(),
            code: "KeyA".into(),
            key_code: 65,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
            repeat: true,
        };
        bridge.replay_remote_key(&payload).await.unwrap();

        let keys = engine.keys().await;
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].kind, KeyEventKind::KeyDown);
        assert!(keys[0].modifiers.ctrl);
        assert!(keys[0].repeat);
        assert_eq!(keys[1].kind, KeyEventKind::KeyPress);
        assert!(keys[1].modifiers.is_empty());
        assert!(!keys[1].repeat);
        assert!(keys.iter().all(|k| !k.trusted));
    }

    #[tokio::test]
    async fn key_up_replays_single_event() {
        let (bridge, engine) = bridge();
        let payload = bridge
            .capture_local_key(&DeviceKeyEvent::release("Enter", "Enter", 13))
            .unwrap();
        bridge.replay_remote_key(&payload).await.unwrap();

        let keys = engine.keys().await;
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].kind, KeyEventKind::KeyUp);
        assert_eq!(keys[0].key_code, 13);
    }

    #[tokio::test]
    async fn remote_launch_only_when_idle() {
        let (bridge, engine) = bridge();
        assert!(bridge.on_remote_launch("x.jsdos").await.unwrap());
        assert!(!bridge.on_remote_launch("y.jsdos").await.unwrap());
        assert_eq!(engine.loaded_url().await.as_deref(), Some("x.jsdos"));
        assert_eq!(engine.loads().await, vec!["x.jsdos".to_string()]);
    }

    #[tokio::test]
    async fn empty_url_is_a_protocol_error() {
        let (bridge, engine) = bridge();
        let err = bridge.on_remote_launch("  ").await.unwrap_err();
        assert!(matches!(err, SyncError::Protocol(_)));
        let err = bridge.load_local("").await.unwrap_err();
        assert!(matches!(err, SyncError::Protocol(_)));
        assert!(engine.loaded_url().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_remote_launches_load_once() {
        let (bridge, engine) = bridge();
        engine.set_load_delay(Duration::from_millis(50)).await;

        let (x, y) = tokio::join!(
            bridge.on_remote_launch("x.jsdos"),
            bridge.on_remote_launch("y.jsdos")
        );
        assert!(x.unwrap());
        assert!(!y.unwrap());
        assert_eq!(engine.loads().await, vec!["x.jsdos".to_string()]);
        assert_eq!(engine.stop_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_launch_waits_for_local_load() {
        let (bridge, engine) = bridge();
        engine.set_load_delay(Duration::from_millis(50)).await;

        let (local, remote) = tokio::join!(
            bridge.load_local("mine.jsdos"),
            bridge.on_remote_launch("theirs.jsdos")
        );
        local.unwrap();
        assert!(!remote.unwrap());
        assert_eq!(engine.loaded_url().await.as_deref(), Some("mine.jsdos"));
        assert_eq!(engine.loads().await, vec!["mine.jsdos".to_string()]);
    }

    #[tokio::test]
    async fn local_load_replaces_running_program() {
        let (bridge, engine) = bridge();
        bridge.load_local("x.jsdos").await.unwrap();
        bridge.load_local("y.jsdos").await.unwrap();
        assert_eq!(engine.loaded_url().await.as_deref(), Some("y.jsdos"));
        assert_eq!(engine.stop_count().await, 1);

        bridge.stop_local().await.unwrap();
        assert!(!engine.is_loaded().await);
    }

    #[tokio::test]
    async fn engine_failures_propagate() {
        let (bridge, engine) = bridge();
        engine.set_fail_loads(true).await;
        let err = bridge.on_remote_launch("x.jsdos").await.unwrap_err();
        assert!(matches!(err, SyncError::Engine(_)));
    }

    #[test]
    fn relay_launch_builds_launch_body() {
        let (bridge, _) = bridge();
        assert_eq!(
            bridge.relay_launch("x.jsdos"),
            Body::Launch {
                url: "x.jsdos".into()
            }
        );
    }
}
