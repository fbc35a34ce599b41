//! Shared in-memory view of the latest completed cycle. The poller writes,
//! the HTTP/WS layers read. Per-game lookups go through the DashMap so the
//! API never scans the full snapshot for one id.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::types::{CycleSnapshot, ProcessedGame};

pub struct SnapshotStore {
    games: DashMap<String, ProcessedGame>,
    last_cycle: Mutex<Option<Arc<CycleSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            games: DashMap::new(),
            last_cycle: Mutex::new(None),
        })
    }

    /// Replace the published snapshot. Games absent from the new cycle are
    /// removed so the per-game index never serves stale entries.
    pub fn publish(&self, snapshot: Arc<CycleSnapshot>) {
        self.games
            .retain(|id, _| snapshot.games.iter().any(|g| &g.game_id == id));
        for game in &snapshot.games {
            self.games.insert(game.game_id.clone(), game.clone());
        }
        if let Ok(mut last) = self.last_cycle.lock() {
            *last = Some(snapshot);
        }
    }

    pub fn latest(&self) -> Option<Arc<CycleSnapshot>> {
        self.last_cycle.lock().ok().and_then(|l| l.clone())
    }

    pub fn game(&self, game_id: &str) -> Option<ProcessedGame> {
        self.games.get(game_id).map(|g| g.clone())
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rankings, Trend, Volatility};

    fn processed(id: &str) -> ProcessedGame {
        ProcessedGame {
            game_id: id.to_string(),
            game_name: format!("Game {id}"),
            provider: None,
            image_path: None,
            image_url: None,
            rtp_teorico: 0.96,
            volatility: Volatility::Medium,
            has_progressive: false,
            daily: None,
            weekly: None,
            trend: Trend::Stable,
            rtp_calculated_daily: None,
            rtp_calculated_weekly: None,
        }
    }

    fn snapshot(ids: &[&str]) -> Arc<CycleSnapshot> {
        Arc::new(CycleSnapshot {
            games: ids.iter().map(|id| processed(id)).collect(),
            rankings_daily: Rankings::default(),
            rankings_weekly: Rankings::default(),
            drift_suspected: false,
            timestamp_ms: 0,
        })
    }

    #[test]
    fn publish_makes_games_and_snapshot_visible() {
        let store = SnapshotStore::new();
        assert!(store.latest().is_none());
        assert!(store.game("1").is_none());

        store.publish(snapshot(&["1", "2"]));
        assert_eq!(store.game_count(), 2);
        assert_eq!(store.game("1").unwrap().game_name, "Game 1");
        assert_eq!(store.latest().unwrap().games.len(), 2);
    }

    #[test]
    fn publish_evicts_games_missing_from_the_new_cycle() {
        let store = SnapshotStore::new();
        store.publish(snapshot(&["1", "2", "3"]));
        store.publish(snapshot(&["2", "4"]));

        assert_eq!(store.game_count(), 2);
        assert!(store.game("1").is_none());
        assert!(store.game("3").is_none());
        assert!(store.game("2").is_some());
        assert!(store.game("4").is_some());
    }
}
