//! Row types read back from SQLite for the history and stats endpoints.

use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GameRow {
    pub game_id: String,
    pub game_name: String,
    pub provider: Option<String>,
    pub image_url: Option<String>,
    pub rtp_teorico: f64,
    pub volatility: String,
    pub has_progressive: bool,
    pub first_seen_at: i64,
    pub last_seen_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WindowMetricsRow {
    pub game_id: String,
    pub window: String,
    pub recorded_at: i64,
    pub magnitude_bps: Option<i64>,
    pub sign: Option<i64>,
    pub n_spins: Option<i64>,
    pub rtp_observado: Option<f64>,
    pub rtp_post: Option<f64>,
    pub delta_post_pp: Option<f64>,
    pub score: Option<f64>,
    pub confidence: Option<String>,
    pub rtp_display_pct: Option<f64>,
    pub trend: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RankingRow {
    pub recorded_at: i64,
    pub window: String,
    pub rank_type: String,
    pub position: i64,
    pub game_id: String,
    pub game_name: String,
    pub score: f64,
    pub delta_post_pp: f64,
    pub confidence: String,
    pub n_spins: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TableCounts {
    pub games: i64,
    pub window_metrics: i64,
    pub rankings: i64,
}
