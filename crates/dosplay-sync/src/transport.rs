//! The host-provided message channel and an in-process implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dosplay_common::{PeerId, SyncError};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Best-effort broadcast to every other participant in the session.
///
/// No ordering, delivery or deduplication guarantee is assumed. The
/// dispatcher calls `send` while holding its state lock, so an
/// implementation must not call back into the dispatcher from inside
/// `send`; queue the payload and deliver it from another task instead.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, protocol_id: &str, payload: String) -> Result<(), SyncError>;
}

/// A payload as delivered by the host, tagged with the sender's address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPayload {
    pub sender: PeerId,
    pub protocol_id: String,
    pub payload: String,
}

// ---------------------------------------------------------------------------
// In-process hub
// ---------------------------------------------------------------------------

const ENDPOINT_QUEUE: usize = 1_024;

/// Broadcast bus connecting any number of in-process endpoints.
#[derive(Clone, Default)]
pub struct MemoryHub {
    endpoints: Arc<RwLock<HashMap<PeerId, mpsc::Sender<InboundPayload>>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` on the bus. Re-registering replaces the previous
    /// endpoint, whose receiver then sees the channel close.
    pub async fn endpoint(
        &self,
        address: impl Into<PeerId>,
    ) -> (MemoryEndpoint, mpsc::Receiver<InboundPayload>) {
        let address = address.into();
        let (tx, rx) = mpsc::channel(ENDPOINT_QUEUE);
        self.endpoints.write().await.insert(address.clone(), tx);
        let endpoint = MemoryEndpoint {
            address,
            hub: self.clone(),
        };
        (endpoint, rx)
    }

    /// Remove `address` from the bus.
    pub async fn disconnect(&self, address: &PeerId) {
        if self.endpoints.write().await.remove(address).is_some() {
            debug!(%address, "Endpoint disconnected");
        }
    }

    pub async fn len(&self) -> usize {
        self.endpoints.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.endpoints.read().await.is_empty()
    }
}

/// One participant's handle on a [`MemoryHub`].
#[derive(Clone)]
pub struct MemoryEndpoint {
    address: PeerId,
    hub: MemoryHub,
}

impl MemoryEndpoint {
    pub fn address(&self) -> &PeerId {
        &self.address
    }
}

#[async_trait]
impl Transport for MemoryEndpoint {
    async fn send(&self, protocol_id: &str, payload: String) -> Result<(), SyncError> {
        let endpoints = self.hub.endpoints.read().await;
        if !endpoints.contains_key(&self.address) {
            return Err(SyncError::Transport(format!(
                "endpoint {} is not connected",
                self.address
            )));
        }

        for (address, tx) in endpoints.iter() {
            if *address == self.address {
                continue;
            }
            let inbound = InboundPayload {
                sender: self.address.clone(),
                protocol_id: protocol_id.to_string(),
                payload: payload.clone(),
            };
            // A full or closed peer queue is a lost packet, not a send failure.
            if let Err(e) = tx.try_send(inbound) {
                warn!(from = %self.address, to = %address, error = %e, "Dropped payload");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcasts_to_everyone_but_sender() {
        let hub = MemoryHub::new();
        let (alice, mut alice_rx) = hub.endpoint("alice").await;
        let (_bob, mut bob_rx) = hub.endpoint("bob").await;
        let (_carol, mut carol_rx) = hub.endpoint("carol").await;

        alice.send("dosplay", "{}".into()).await.unwrap();

        for rx in [&mut bob_rx, &mut carol_rx] {
            let msg = rx.try_recv().unwrap();
            assert_eq!(msg.sender, PeerId::from("alice"));
            assert_eq!(msg.protocol_id, "dosplay");
            assert_eq!(msg.payload, "{}");
        }
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnected_endpoint_cannot_send() {
        let hub = MemoryHub::new();
        let (alice, _alice_rx) = hub.endpoint("alice").await;
        let (_bob, mut bob_rx) = hub.endpoint("bob").await;

        hub.disconnect(alice.address()).await;
        assert_eq!(hub.len().await, 1);

        let err = alice.send("dosplay", "{}".into()).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_fail_the_sender() {
        let hub = MemoryHub::new();
        let (alice, _alice_rx) = hub.endpoint("alice").await;
        let (_bob, bob_rx) = hub.endpoint("bob").await;
        drop(bob_rx);

        assert!(alice.send("dosplay", "{}".into()).await.is_ok());
    }
}
