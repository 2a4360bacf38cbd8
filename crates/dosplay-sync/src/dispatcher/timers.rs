//! Periodic heartbeat and prune tasks.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::client::Dispatcher;

/// Run `tick` every `period` until `cancel` fires or the dispatcher is
/// dropped. The first tick happens one full period after spawning.
pub(crate) fn spawn_periodic<F, Fut>(
    name: &'static str,
    dispatcher: Weak<Dispatcher>,
    period: Duration,
    cancel: CancellationToken,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<Dispatcher>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let Some(dispatcher) = dispatcher.upgrade() else {
                        break;
                    };
                    tick(dispatcher).await;
                }
            }
        }
        debug!(timer = name, "Timer stopped");
    })
}
