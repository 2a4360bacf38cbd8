//! A transport wrapper that drops and duplicates payloads at random.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dosplay_common::SyncError;
use dosplay_sync::Transport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::trace;

/// Counters for one lossy link.
#[derive(Debug, Default)]
pub struct LinkStats {
    pub sent: AtomicU64,
    pub dropped: AtomicU64,
    pub duplicated: AtomicU64,
}

pub struct LossyTransport {
    inner: Arc<dyn Transport>,
    drop_rate: f64,
    duplicate_rate: f64,
    rng: Mutex<StdRng>,
    stats: Arc<LinkStats>,
}

fn probability(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

impl LossyTransport {
    /// Rates are probabilities in `0.0..=1.0`; out-of-range values are
    /// clamped and NaN counts as zero.
    pub fn new(inner: Arc<dyn Transport>, drop_rate: f64, duplicate_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            drop_rate: probability(drop_rate),
            duplicate_rate: probability(duplicate_rate),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            stats: Arc::new(LinkStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<LinkStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Transport for LossyTransport {
    async fn send(&self, protocol_id: &str, payload: String) -> Result<(), SyncError> {
        let (drop, duplicate) = {
            let mut rng = self.rng.lock().await;
            (
                rng.gen_bool(self.drop_rate),
                rng.gen_bool(self.duplicate_rate),
            )
        };
        self.stats.sent.fetch_add(1, Ordering::Relaxed);

        if drop {
            trace!("Payload dropped");
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        if duplicate {
            self.stats.duplicated.fetch_add(1, Ordering::Relaxed);
            self.inner.send(protocol_id, payload.clone()).await?;
        }
        self.inner.send(protocol_id, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dosplay_sync::{InboundPayload, MemoryHub};
    use tokio::sync::mpsc;

    async fn link(drop_rate: f64, duplicate_rate: f64) -> (LossyTransport, mpsc::Receiver<InboundPayload>) {
        let hub = MemoryHub::new();
        let (tx, _tx_rx) = hub.endpoint("tx").await;
        let (_rx, rx_rx) = hub.endpoint("rx").await;
        (LossyTransport::new(Arc::new(tx), drop_rate, duplicate_rate, 7), rx_rx)
    }

    fn drain(rx: &mut mpsc::Receiver<InboundPayload>) -> usize {
        let mut n = 0;
        while rx.try_recv().is_ok() {
            n += 1;
        }
        n
    }

    #[tokio::test]
    async fn clean_link_delivers_once() {
        let (link, mut rx) = link(0.0, 0.0).await;
        for _ in 0..10 {
            link.send("dosplay", "{}".into()).await.unwrap();
        }
        assert_eq!(drain(&mut rx), 10);
        assert_eq!(link.stats().dropped.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn full_loss_delivers_nothing() {
        let (link, mut rx) = link(1.0, 0.0).await;
        for _ in 0..10 {
            link.send("dosplay", "{}".into()).await.unwrap();
        }
        assert_eq!(drain(&mut rx), 0);
        assert_eq!(link.stats().dropped.load(Ordering::Relaxed), 10);
    }

    #[tokio::test]
    async fn full_duplication_delivers_twice() {
        let (link, mut rx) = link(0.0, 1.0).await;
        for _ in 0..5 {
            link.send("dosplay", "{}".into()).await.unwrap();
        }
        assert_eq!(drain(&mut rx), 10);
        assert_eq!(link.stats().duplicated.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn rates_are_clamped() {
        let hub = MemoryHub::new();
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (tx, _rx) = rt.block_on(hub.endpoint("tx"));
        let link = LossyTransport::new(Arc::new(tx), 3.0, -1.0, 0);
        assert_eq!(link.drop_rate, 1.0);
        assert_eq!(link.duplicate_rate, 0.0);
    }

    #[test]
    fn nan_rates_never_fire() {
        let hub = MemoryHub::new();
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (tx, _rx) = rt.block_on(hub.endpoint("tx"));
        let link = LossyTransport::new(Arc::new(tx), f64::NAN, f64::NAN, 0);
        assert_eq!(link.drop_rate, 0.0);
        assert_eq!(link.duplicate_rate, 0.0);
    }
}
