//! The polling loop: fetch both window frames, decode, derive, rank, then
//! publish to the in-memory store, the DB writer queue and the WebSocket
//! broadcast.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::api::health::{now_ms, HealthState};
use crate::api::latency::LatencyStats;
use crate::config::Config;
use crate::extract::extract_games;
use crate::fetcher::{merge_windows, UpstreamClient};
use crate::rtp::ranking::generate_rankings;
use crate::rtp::DeriveMetrics;
use crate::state::SnapshotStore;
use crate::types::{CycleSnapshot, GameRecord, GameWindow, ProcessedGame, PushMessage};

pub struct Poller {
    client: Arc<UpstreamClient>,
    store: Arc<SnapshotStore>,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
    push_tx: broadcast::Sender<String>,
    db_tx: mpsc::Sender<Arc<CycleSnapshot>>,
    engine: Box<dyn DeriveMetrics>,
    poll_interval: Duration,
    ranking_limit: usize,
}

impl Poller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: &Config,
        client: Arc<UpstreamClient>,
        store: Arc<SnapshotStore>,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
        push_tx: broadcast::Sender<String>,
        db_tx: mpsc::Sender<Arc<CycleSnapshot>>,
        engine: Box<dyn DeriveMetrics>,
    ) -> Self {
        Self {
            client,
            store,
            health,
            latency,
            push_tx,
            db_tx,
            engine,
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            ranking_limit: cfg.ranking_limit,
        }
    }

    pub async fn run(self) {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "poller started"
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.cycle().await;
        }
    }

    /// One serialized polling cycle. A fully failed fetch is reported to
    /// clients but never aborts the loop.
    async fn cycle(&self) {
        let frames = self.client.fetch_all().await;
        if frames.all_failed() {
            self.health.record_cycle_failed();
            self.push(PushMessage::Error {
                message: frames.errors.join("; "),
                timestamp: now_ms(),
            });
            return;
        }

        // Time the local work only; network time is not decode latency.
        let decode_started = Instant::now();

        let mut drift = false;
        let daily = self.decode(frames.daily, GameWindow::Daily, &mut drift);
        let weekly = self.decode(frames.weekly, GameWindow::Weekly, &mut drift);

        let merged = merge_windows(daily, weekly);
        let games: Vec<ProcessedGame> = merged.iter().map(|g| self.engine.process(g)).collect();

        let rankings_daily = generate_rankings(&games, GameWindow::Daily, self.ranking_limit);
        let rankings_weekly = generate_rankings(&games, GameWindow::Weekly, self.ranking_limit);

        self.latency.record(decode_started.elapsed());

        let snapshot = Arc::new(CycleSnapshot {
            games,
            rankings_daily,
            rankings_weekly,
            drift_suspected: drift,
            timestamp_ms: now_ms(),
        });

        self.store.publish(Arc::clone(&snapshot));

        // try_send: a saturated writer queue drops this cycle's persistence
        // rather than stalling the poll loop.
        if let Err(e) = self.db_tx.try_send(Arc::clone(&snapshot)) {
            warn!("cycle not queued for persistence: {e}");
        }

        self.push(PushMessage::Update {
            data: (*snapshot).clone(),
            timestamp: snapshot.timestamp_ms,
        });

        self.health.set_drift_suspected(drift);
        self.health.record_cycle_ok();
        info!(
            games = snapshot.games.len(),
            drift_suspected = drift,
            "cycle completed"
        );
    }

    fn decode(
        &self,
        frame: Option<Vec<u8>>,
        window: GameWindow,
        drift: &mut bool,
    ) -> Vec<GameRecord> {
        let Some(frame) = frame else {
            return Vec::new();
        };
        let outcome = extract_games(&frame, window);
        *drift |= outcome.stats.drift_suspected;
        outcome.games
    }

    fn push(&self, message: PushMessage) {
        match serde_json::to_string(&message) {
            // send() errs only when no client is subscribed.
            Ok(json) => {
                let _ = self.push_tx.send(json);
            }
            Err(e) => error!("failed to serialize push message: {e}"),
        }
    }
}
