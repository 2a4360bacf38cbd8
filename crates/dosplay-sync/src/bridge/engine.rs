//! The execution engine seam and a headless implementation.

use std::time::Duration;

use async_trait::async_trait;
use dosplay_common::SyncError;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::types::SyntheticKeyEvent;

/// Runs program bundles and accepts injected key events.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn is_loaded(&self) -> bool;

    async fn load(&self, url: &str) -> Result<(), SyncError>;

    /// Stop the running program. Stopping an idle engine is not an error.
    async fn stop(&self) -> Result<(), SyncError>;

    async fn dispatch_key(&self, event: SyntheticKeyEvent) -> Result<(), SyncError>;
}

#[derive(Debug, Default)]
struct HeadlessState {
    loaded: Option<String>,
    loads: Vec<String>,
    stops: usize,
    keys: Vec<SyntheticKeyEvent>,
    fail_loads: bool,
    load_delay: Duration,
}

/// Engine that runs nothing and records every call.
///
/// Used by the simulator and tests in place of a real emulator.
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    state: RwLock<HeadlessState>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `load` calls fail, as a missing bundle would.
    pub async fn set_fail_loads(&self, fail: bool) {
        self.state.write().await.fail_loads = fail;
    }

    /// Make `load` take this long, as fetching a real bundle would.
    pub async fn set_load_delay(&self, delay: Duration) {
        self.state.write().await.load_delay = delay;
    }

    pub async fn loaded_url(&self) -> Option<String> {
        self.state.read().await.loaded.clone()
    }

    /// Every URL successfully loaded, in order.
    pub async fn loads(&self) -> Vec<String> {
        self.state.read().await.loads.clone()
    }

    pub async fn stop_count(&self) -> usize {
        self.state.read().await.stops
    }

    pub async fn keys(&self) -> Vec<SyntheticKeyEvent> {
        self.state.read().await.keys.clone()
    }
}

#[async_trait]
impl Engine for HeadlessEngine {
    async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded.is_some()
    }

    async fn load(&self, url: &str) -> Result<(), SyncError> {
        let delay = self.state.read().await.load_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.write().await;
        if state.fail_loads {
            return Err(SyncError::Engine(format!("cannot load {url}")));
        }
        info!(url, "Bundle loaded");
        state.loaded = Some(url.to_string());
        state.loads.push(url.to_string());
        Ok(())
    }

    async fn stop(&self) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        if let Some(url) = state.loaded.take() {
            info!(url, "Bundle stopped");
            state.stops += 1;
        }
        Ok(())
    }

    async fn dispatch_key(&self, event: SyntheticKeyEvent) -> Result<(), SyncError> {
        debug!(kind = ?event.kind, key = %event.key, "Key injected");
        self.state.write().await.keys.push(event);
        Ok(())
    }
}
