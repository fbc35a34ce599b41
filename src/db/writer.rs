//! Background persistence task. The poller sends completed cycle snapshots
//! over an mpsc channel; writes never block the polling loop.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::types::{CycleSnapshot, GameWindow, RankingEntry};

pub struct DbWriter {
    pool: SqlitePool,
    rx: mpsc::Receiver<Arc<CycleSnapshot>>,
}

impl DbWriter {
    pub fn new(pool: SqlitePool, rx: mpsc::Receiver<Arc<CycleSnapshot>>) -> Self {
        Self { pool, rx }
    }

    pub async fn run(mut self) {
        info!("db writer started");
        while let Some(snapshot) = self.rx.recv().await {
            match persist_cycle(&self.pool, &snapshot).await {
                Ok(()) => debug!(
                    games = snapshot.games.len(),
                    ts = snapshot.timestamp_ms,
                    "cycle persisted"
                ),
                Err(e) => error!("failed to persist cycle: {e}"),
            }
        }
        info!("db writer channel closed, exiting");
    }
}

/// Write one cycle in a single transaction: game catalog upserts, per-window
/// time-series rows and leaderboard history.
pub async fn persist_cycle(pool: &SqlitePool, snapshot: &CycleSnapshot) -> Result<()> {
    let mut tx = pool.begin().await?;
    let ts = snapshot.timestamp_ms as i64;

    for game in &snapshot.games {
        sqlx::query(
            "INSERT INTO games \
             (game_id, game_name, provider, image_url, rtp_teorico, volatility, \
              has_progressive, first_seen_at, last_seen_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
             ON CONFLICT(game_id) DO UPDATE SET \
               game_name = excluded.game_name, \
               provider = excluded.provider, \
               image_url = excluded.image_url, \
               last_seen_at = excluded.last_seen_at",
        )
        .bind(&game.game_id)
        .bind(&game.game_name)
        .bind(&game.provider)
        .bind(&game.image_url)
        .bind(game.rtp_teorico)
        .bind(game.volatility.to_string())
        .bind(game.has_progressive)
        .bind(ts)
        .execute(&mut *tx)
        .await?;

        let windows = [
            (GameWindow::Daily, game.daily.as_ref(), game.rtp_calculated_daily),
            (GameWindow::Weekly, game.weekly.as_ref(), game.rtp_calculated_weekly),
        ];
        for (window, metrics, display_pct) in windows {
            if metrics.is_none() && display_pct.is_none() {
                continue;
            }
            sqlx::query(
                "INSERT INTO window_metrics \
                 (game_id, window, recorded_at, magnitude_bps, sign, n_spins, \
                  rtp_observado, rtp_post, delta_post_pp, score, confidence, \
                  rtp_display_pct, trend) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )
            .bind(&game.game_id)
            .bind(window.label())
            .bind(ts)
            .bind(metrics.map(|m| saturating_i64(m.magnitude_bps)))
            .bind(metrics.map(|m| i64::from(m.sign)))
            .bind(metrics.map(|m| saturating_i64(m.n_spins)))
            .bind(metrics.map(|m| m.rtp_observado))
            .bind(metrics.map(|m| m.rtp_post))
            .bind(metrics.map(|m| m.delta_post_pp))
            .bind(metrics.map(|m| m.score))
            .bind(metrics.map(|m| m.confidence.to_string()))
            .bind(display_pct)
            .bind(game.trend.to_string())
            .execute(&mut *tx)
            .await?;
        }
    }

    let boards = [
        (GameWindow::Daily, &snapshot.rankings_daily),
        (GameWindow::Weekly, &snapshot.rankings_weekly),
    ];
    for (window, rankings) in boards {
        for entry in rankings.best.iter().chain(rankings.worst.iter()) {
            insert_ranking(&mut tx, ts, window, entry).await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

async fn insert_ranking(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    ts: i64,
    window: GameWindow,
    entry: &RankingEntry,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO rankings \
         (recorded_at, window, rank_type, position, game_id, game_name, \
          score, delta_post_pp, confidence, n_spins) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(ts)
    .bind(window.label())
    .bind(entry.rank_type.to_string())
    .bind(i64::from(entry.position))
    .bind(&entry.game_id)
    .bind(&entry.game_name)
    .bind(entry.score)
    .bind(entry.delta_post_pp)
    .bind(entry.confidence.to_string())
    .bind(saturating_i64(entry.n_spins))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Wire-sourced counters are u64 and can exceed i64::MAX; saturate instead
/// of letting an `as` cast wrap them into large negative column values.
fn saturating_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Delete time-series and leaderboard rows older than `cutoff_ms`. Returns
/// (metrics_deleted, rankings_deleted). The game catalog is kept.
pub async fn cleanup_before(pool: &SqlitePool, cutoff_ms: i64) -> Result<(u64, u64)> {
    let metrics = sqlx::query("DELETE FROM window_metrics WHERE recorded_at < ?1")
        .bind(cutoff_ms)
        .execute(pool)
        .await?
        .rows_affected();
    let rankings = sqlx::query("DELETE FROM rankings WHERE recorded_at < ?1")
        .bind(cutoff_ms)
        .execute(pool)
        .await?
        .rows_affected();
    Ok((metrics, rankings))
}
