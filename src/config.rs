use crate::error::{AppError, Result};

pub const UPSTREAM_URL: &str = "https://cgg.bet.br/casinogo/widgets/v2/live-rtp";
pub const ASSET_BASE_URL: &str = "https://cgg.bet.br";

/// Fixed `limit` field of the upstream request body (`[0x08, sel, 0x10, 0x02]`).
pub const REQUEST_LIMIT: u64 = 2;

/// Only length-delimited field-4 values with this prefix are accepted as image paths.
pub const STATIC_ASSET_PREFIX: &str = "/static";

/// Baseline theoretical RTP assumed when a game has no known context.
pub const DEFAULT_THEORETICAL_RTP: f64 = 0.96;

/// Channel capacity for internal message routing.
pub const CHANNEL_CAPACITY: usize = 1024;

/// WebSocket push fan-out buffer (messages per subscriber before lagging).
pub const PUSH_BUFFER: usize = 64;

/// Schema drift heuristics: a frame at least this long that parses below
/// MIN_PARSE_RATIO, or yields more than MAX_GAMES_PER_FRAME records, is
/// flagged as drift-suspected rather than "no games right now".
pub const DRIFT_MIN_FRAME_LEN: usize = 64;
pub const DRIFT_MIN_PARSE_RATIO: f64 = 0.5;
pub const MAX_GAMES_PER_FRAME: usize = 512;

/// Which derivation pipeline the poll cycle runs. The two pipelines use
/// different basis-point scalings and must never be collapsed into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// Shrinkage toward the theoretical RTP, scores, rankings.
    Bayesian,
    /// Raw signed percentages for display; no sample-size context needed.
    Direct,
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pipeline::Bayesian => write!(f, "bayesian"),
            Pipeline::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub upstream_url: String,
    /// Base URL prepended to accepted image paths (ASSET_BASE_URL).
    pub asset_base_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Poll cycle interval in milliseconds (UPDATE_INTERVAL_MS).
    pub poll_interval_ms: u64,
    /// Entries per leaderboard side (RANKING_LIMIT).
    pub ranking_limit: usize,
    /// Days of history kept by the cleanup endpoint default (RETENTION_DAYS).
    pub retention_days: i64,
    /// Derivation pipeline (PIPELINE=bayesian|direct).
    pub pipeline: Pipeline,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let pipeline = match std::env::var("PIPELINE")
            .unwrap_or_else(|_| "bayesian".to_string())
            .to_lowercase()
            .as_str()
        {
            "bayesian" => Pipeline::Bayesian,
            "direct" => Pipeline::Direct,
            other => {
                return Err(AppError::Config(format!(
                    "PIPELINE must be 'bayesian' or 'direct', got '{other}'"
                )))
            }
        };

        Ok(Self {
            upstream_url: std::env::var("UPSTREAM_URL").unwrap_or_else(|_| UPSTREAM_URL.to_string()),
            asset_base_url: std::env::var("ASSET_BASE_URL")
                .unwrap_or_else(|_| ASSET_BASE_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "rtp.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            poll_interval_ms: std::env::var("UPDATE_INTERVAL_MS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u64>()
                .unwrap_or(3000),
            ranking_limit: std::env::var("RANKING_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<usize>()
                .unwrap_or(10),
            retention_days: std::env::var("RETENTION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse::<i64>()
                .unwrap_or(7),
            pipeline,
        })
    }
}
