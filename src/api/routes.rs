//! HTTP surface: health, latest snapshot, per-game history, leaderboards,
//! storage stats and retention cleanup, plus the `/ws` upgrade.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::info;

use crate::api::health::{now_ms, HealthState};
use crate::api::latency::LatencyStats;
use crate::api::ws::{self, ClientRegistry};
use crate::db::models::WindowMetricsRow;
use crate::db::writer::cleanup_before;
use crate::error::{AppError, Result};
use crate::state::SnapshotStore;

const DEFAULT_HISTORY_LIMIT: i64 = 500;
const MAX_HISTORY_LIMIT: i64 = 5_000;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub store: Arc<SnapshotStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    pub push_tx: broadcast::Sender<String>,
    pub registry: Arc<ClientRegistry>,
    pub retention_days: i64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/games/latest", get(latest_games))
        .route("/api/games/:id/history", get(game_history))
        .route("/api/rankings", get(rankings))
        .route("/api/stats", get(stats))
        .route("/api/stats/latency", get(latency))
        .route("/api/cleanup", post(cleanup))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.health.report()))
}

async fn latest_games(State(state): State<AppState>) -> Json<Value> {
    match state.store.latest() {
        Some(snapshot) => Json(json!({
            "games": snapshot.games,
            "drift_suspected": snapshot.drift_suspected,
            "timestamp_ms": snapshot.timestamp_ms,
        })),
        None => Json(json!({
            "games": [],
            "drift_suspected": false,
            "timestamp_ms": null,
        })),
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    /// "24h" or "7d"; omitted means both windows.
    window: Option<String>,
    limit: Option<i64>,
}

async fn game_history(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>> {
    if let Some(window) = query.window.as_deref() {
        if window != "24h" && window != "7d" {
            return Err(AppError::Config(format!("unknown window '{window}'")));
        }
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let rows: Vec<WindowMetricsRow> = match query.window {
        Some(window) => {
            sqlx::query_as(
                "SELECT game_id, window, recorded_at, magnitude_bps, sign, n_spins, \
                        rtp_observado, rtp_post, delta_post_pp, score, confidence, \
                        rtp_display_pct, trend \
                 FROM window_metrics \
                 WHERE game_id = ?1 AND window = ?2 \
                 ORDER BY recorded_at DESC LIMIT ?3",
            )
            .bind(&game_id)
            .bind(window)
            .bind(limit)
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT game_id, window, recorded_at, magnitude_bps, sign, n_spins, \
                        rtp_observado, rtp_post, delta_post_pp, score, confidence, \
                        rtp_display_pct, trend \
                 FROM window_metrics \
                 WHERE game_id = ?1 \
                 ORDER BY recorded_at DESC LIMIT ?2",
            )
            .bind(&game_id)
            .bind(limit)
            .fetch_all(&state.pool)
            .await?
        }
    };

    Ok(Json(json!({
        "game_id": game_id,
        "current": state.store.game(&game_id),
        "history": rows,
    })))
}

async fn rankings(State(state): State<AppState>) -> Json<Value> {
    match state.store.latest() {
        Some(snapshot) => Json(json!({
            "daily": snapshot.rankings_daily,
            "weekly": snapshot.rankings_weekly,
            "timestamp_ms": snapshot.timestamp_ms,
        })),
        None => Json(json!({
            "daily": { "best": [], "worst": [] },
            "weekly": { "best": [], "worst": [] },
            "timestamp_ms": null,
        })),
    }
}

async fn stats(State(state): State<AppState>) -> Result<Json<Value>> {
    let (games,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM games")
        .fetch_one(&state.pool)
        .await?;
    let (metrics,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM window_metrics")
        .fetch_one(&state.pool)
        .await?;
    let (rankings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rankings")
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(json!({
        "db": {
            "games": games,
            "window_metrics": metrics,
            "rankings": rankings,
        },
        "live_games": state.store.game_count(),
        "ws_clients": state.registry.len(),
    })))
}

async fn latency(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.latency.report()))
}

async fn cleanup(State(state): State<AppState>) -> Result<Json<Value>> {
    let cutoff_ms = now_ms() as i64 - state.retention_days * 86_400_000;
    let (metrics_deleted, rankings_deleted) = cleanup_before(&state.pool, cutoff_ms).await?;
    info!(
        cutoff_ms,
        metrics_deleted, rankings_deleted, "retention cleanup completed"
    );
    Ok(Json(json!({
        "cutoff_ms": cutoff_ms,
        "metrics_deleted": metrics_deleted,
        "rankings_deleted": rankings_deleted,
    })))
}
