//! Runs a whole session in-process and reports how far it converged.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dosplay_common::{DosplayError, SessionId};
use dosplay_config::SyncConfig;
use dosplay_sync::{
    parse_participants, DeviceKeyEvent, Dispatcher, HeadlessEngine, MemoryHub, SyncEvent,
};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info};

use crate::lossy::{LinkStats, LossyTransport};

/// Key presses sent by the driver.
const KEYS: &[(&str, &str, u32)] = &[
    ("ArrowLeft", "ArrowLeft", 37),
    ("ArrowUp", "ArrowUp", 38),
    ("ArrowRight", "ArrowRight", 39),
    ("ArrowDown", "ArrowDown", 40),
    (" ", "Space", 32),
    ("Enter", "Enter", 13),
];

const KEY_GAP: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct Scenario {
    pub participants: usize,
    pub duration: Duration,
    pub drop_rate: f64,
    pub duplicate_rate: f64,
    /// Key strokes (down + up) typed by the driver after launch.
    pub keys: usize,
    /// Keys typed by the driver before the session starts.
    pub early_keys: usize,
    pub bundle: String,
    pub seed: u64,
    pub sync: SyncConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            participants: 3,
            duration: Duration::from_secs(12),
            drop_rate: 0.0,
            duplicate_rate: 0.0,
            keys: 10,
            early_keys: 2,
            bundle: "https://v8.js-dos.com/bundles/digger.jsdos".into(),
            seed: 1,
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticipantReport {
    pub address: String,
    pub peer_count: usize,
    pub status_text: String,
    pub loaded: Option<String>,
    /// Synthetic events injected into this participant's engine.
    pub replayed_events: usize,
    pub pending: usize,
    pub sent: u64,
    pub dropped: u64,
    pub duplicated: u64,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub bundle: String,
    /// Key strokes the driver mirrored, including pre-session ones.
    pub strokes: usize,
    pub participants: Vec<ParticipantReport>,
}

impl Report {
    /// Every participant sees every other one.
    pub fn peers_converged(&self) -> bool {
        let expected = self.participants.len().saturating_sub(1);
        self.participants.iter().all(|p| p.peer_count == expected)
    }

    /// Every participant runs the driver's bundle.
    pub fn bundle_converged(&self) -> bool {
        self.participants
            .iter()
            .all(|p| p.loaded.as_deref() == Some(self.bundle.as_str()))
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        for p in &self.participants {
            out.push_str(&format!(
                "{:<4} {:<20} loaded={:<5} replayed={:<4} pending={:<4} sent={} dropped={} duplicated={}\n",
                p.address,
                p.status_text,
                p.loaded.is_some(),
                p.replayed_events,
                p.pending,
                p.sent,
                p.dropped,
                p.duplicated,
            ));
        }
        out.push_str(&format!(
            "peers converged: {}, bundle converged: {}",
            self.peers_converged(),
            self.bundle_converged()
        ));
        out
    }
}

struct Participant {
    address: String,
    dispatcher: Arc<Dispatcher>,
    engine: Arc<HeadlessEngine>,
    stats: Arc<LinkStats>,
}

/// Participant 0 drives: it types a few keys before the session starts,
/// then launches the bundle and types the rest.
pub async fn run(scenario: Scenario) -> Result<Report, DosplayError> {
    if scenario.participants < 2 {
        return Err(DosplayError::Other(
            "a session needs at least two participants".into(),
        ));
    }
    for (name, rate) in [
        ("drop_rate", scenario.drop_rate),
        ("duplicate_rate", scenario.duplicate_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            return Err(DosplayError::Other(format!(
                "{name} = {rate} is not a probability between 0 and 1"
            )));
        }
    }

    let hub = MemoryHub::new();
    let addresses: Vec<String> = (0..scenario.participants).map(|i| format!("p{i}")).collect();
    let roster = addresses.join(",");

    let mut participants = Vec::with_capacity(addresses.len());
    for (i, address) in addresses.iter().enumerate() {
        let (endpoint, inbound) = hub.endpoint(address.as_str()).await;
        let lossy = LossyTransport::new(
            Arc::new(endpoint),
            scenario.drop_rate,
            scenario.duplicate_rate,
            scenario.seed.wrapping_add(i as u64),
        );
        let stats = lossy.stats();
        let engine = Arc::new(HeadlessEngine::new());
        let (dispatcher, events) =
            Dispatcher::with_system_clock(scenario.sync.clone(), Arc::new(lossy), engine.clone());
        dispatcher.spawn_receiver(inbound);
        spawn_event_logger(address.clone(), events);

        participants.push(Participant {
            address: address.clone(),
            dispatcher,
            engine,
            stats,
        });
    }

    let Some((driver, others)) = participants.split_first() else {
        return Err(DosplayError::Other("no participants".into()));
    };

    let mut strokes = 0;
    for _ in 0..scenario.early_keys {
        type_key(&driver.dispatcher, strokes).await;
        strokes += 1;
    }

    // Everyone else joins first so the driver's flushed input has
    // somewhere to land.
    for p in others {
        p.dispatcher
            .initialize(SessionId::generate(), parse_participants(&roster))
            .await;
    }
    driver
        .dispatcher
        .initialize(SessionId::generate(), parse_participants(&roster))
        .await;

    driver.dispatcher.launch(&scenario.bundle).await?;

    for _ in 0..scenario.keys {
        type_key(&driver.dispatcher, strokes).await;
        strokes += 1;
        time::sleep(KEY_GAP).await;
    }

    time::sleep(scenario.duration).await;

    let mut reports = Vec::with_capacity(participants.len());
    for p in &participants {
        let status = p.dispatcher.status().await;
        reports.push(ParticipantReport {
            address: p.address.clone(),
            peer_count: status.peer_count,
            status_text: status.status_text(),
            loaded: p.engine.loaded_url().await,
            replayed_events: p.engine.keys().await.len(),
            pending: p.dispatcher.pending_count().await,
            sent: p.stats.sent.load(Ordering::Relaxed),
            dropped: p.stats.dropped.load(Ordering::Relaxed),
            duplicated: p.stats.duplicated.load(Ordering::Relaxed),
        });
    }
    for p in &participants {
        p.dispatcher.end_session().await;
    }

    Ok(Report {
        bundle: scenario.bundle,
        strokes,
        participants: reports,
    })
}

/// Press and release one key from the fixed rotation.
async fn type_key(dispatcher: &Dispatcher, n: usize) {
    let (key, code, key_code) = KEYS[n % KEYS.len()];
    dispatcher
        .capture_local_key(&DeviceKeyEvent::press(key, code, key_code))
        .await;
    dispatcher
        .capture_local_key(&DeviceKeyEvent::release(key, code, key_code))
        .await;
}

fn spawn_event_logger(address: String, mut events: mpsc::Receiver<SyncEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SyncEvent::StatusChanged(status) => {
                    info!(participant = %address, status = %status.status_text(), "Status changed");
                }
                SyncEvent::RemoteLaunch { url, accepted } => {
                    info!(participant = %address, url, accepted, "Remote launch");
                }
                other => debug!(participant = %address, event = ?other, "Sync event"),
            }
        }
    });
}
