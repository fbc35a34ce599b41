use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Time windows
// ---------------------------------------------------------------------------

/// The two polled time windows. The upstream request body selects them by
/// the varint value of field 1 (daily=1, weekly=2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameWindow {
    #[serde(rename = "24h")]
    Daily,
    #[serde(rename = "7d")]
    Weekly,
}

impl GameWindow {
    pub fn selector(self) -> u64 {
        match self {
            GameWindow::Daily => 1,
            GameWindow::Weekly => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GameWindow::Daily => "24h",
            GameWindow::Weekly => "7d",
        }
    }
}

impl std::fmt::Display for GameWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Game classification
// ---------------------------------------------------------------------------

/// Volatility tier controlling the Bayesian prior strength k.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Volatility {
    /// Prior strength k: spins needed before observed data carries half the weight.
    pub fn prior_strength(self) -> f64 {
        match self {
            Volatility::Low => 50_000.0,
            Volatility::Medium => 100_000.0,
            Volatility::High => 150_000.0,
            Volatility::VeryHigh => 200_000.0,
        }
    }

    /// Tie-break ordering for rankings: lower volatility ranks first.
    pub fn tier_order(self) -> u8 {
        match self {
            Volatility::Low => 0,
            Volatility::Medium => 1,
            Volatility::High => 2,
            Volatility::VeryHigh => 3,
        }
    }
}

impl std::fmt::Display for Volatility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Volatility::Low => "low",
            Volatility::Medium => "medium",
            Volatility::High => "high",
            Volatility::VeryHigh => "very_high",
        };
        write!(f, "{s}")
    }
}

/// Sample-size confidence label. Low-confidence games are excluded from
/// rankings entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        write!(f, "{s}")
    }
}

/// Short-vs-long-window trend direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Decoded records
// ---------------------------------------------------------------------------

/// One game entry recovered from a single window's frame. Fields are filled
/// as the wire walker encounters them; a record without `game_name` is
/// dropped by the extractor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRecord {
    pub game_id: Option<String>,
    pub game_name: Option<String>,
    pub provider: Option<String>,
    pub image_path: Option<String>,
    /// Unsigned magnitude of the RTP deviation in basis points.
    pub magnitude_bps: Option<u64>,
    /// -1, 0 or 1, decoded from the uint64-as-int64 sign field.
    pub sign: Option<i8>,
}

/// Daily + weekly records combined by `game_id`. Either window's pair may be
/// absent when the game appeared in only one response.
#[derive(Debug, Clone, Serialize)]
pub struct MergedGame {
    pub game_id: String,
    pub game_name: String,
    pub provider: Option<String>,
    pub image_path: Option<String>,
    pub magnitude_bps_daily: Option<u64>,
    pub sign_daily: Option<i8>,
    pub magnitude_bps_weekly: Option<u64>,
    pub sign_weekly: Option<i8>,
}

/// Per-game statistical context. The upstream payload carries none of this,
/// so defaults apply: medium volatility, no progressive jackpot, unknown
/// sample sizes (n_spins=0 means "no shrinkage possible").
#[derive(Debug, Clone, Copy)]
pub struct GameContext {
    pub rtp_teorico: f64,
    pub volatility: Volatility,
    pub has_progressive: bool,
    pub n_spins_daily: u64,
    pub n_spins_weekly: u64,
}

impl Default for GameContext {
    fn default() -> Self {
        Self {
            rtp_teorico: crate::config::DEFAULT_THEORETICAL_RTP,
            volatility: Volatility::Medium,
            has_progressive: false,
            n_spins_daily: 0,
            n_spins_weekly: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived metrics
// ---------------------------------------------------------------------------

/// Bayesian-pipeline output for one game and one window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowMetrics {
    pub window: GameWindow,
    pub magnitude_bps: u64,
    pub sign: i8,
    pub n_spins: u64,
    /// Observed RTP as a fraction (e.g. 0.9804).
    pub rtp_observado: f64,
    /// Posterior RTP; equals rtp_observado when n_spins=0.
    pub rtp_post: f64,
    /// Posterior deviation from theoretical, in percentage points.
    pub delta_post_pp: f64,
    pub score: f64,
    pub confidence: Confidence,
}

/// A fully processed game: merged identity plus whichever pipeline's output
/// applies. The Bayesian pipeline fills `daily`/`weekly`/`trend`; the
/// direct-display pipeline fills `rtp_calculated_*` signed percentages.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedGame {
    pub game_id: String,
    pub game_name: String,
    pub provider: Option<String>,
    pub image_path: Option<String>,
    pub image_url: Option<String>,
    pub rtp_teorico: f64,
    pub volatility: Volatility,
    pub has_progressive: bool,
    pub daily: Option<WindowMetrics>,
    pub weekly: Option<WindowMetrics>,
    pub trend: Trend,
    pub rtp_calculated_daily: Option<f64>,
    pub rtp_calculated_weekly: Option<f64>,
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankType {
    Best,
    Worst,
}

impl std::fmt::Display for RankType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankType::Best => write!(f, "best"),
            RankType::Worst => write!(f, "worst"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub game_id: String,
    pub game_name: String,
    pub provider: Option<String>,
    pub rank_type: RankType,
    /// 1-based position within its leaderboard.
    pub position: u32,
    pub score: f64,
    pub delta_post_pp: f64,
    pub confidence: Confidence,
    pub n_spins: u64,
    pub volatility: Volatility,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Rankings {
    pub best: Vec<RankingEntry>,
    pub worst: Vec<RankingEntry>,
}

// ---------------------------------------------------------------------------
// Cycle output, published to API, DB writer and WebSocket push
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CycleSnapshot {
    pub games: Vec<ProcessedGame>,
    pub rankings_daily: Rankings,
    pub rankings_weekly: Rankings,
    /// Set when extraction looked like upstream format drift rather than an
    /// empty-but-healthy response.
    pub drift_suspected: bool,
    pub timestamp_ms: u64,
}

/// JSON envelope pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PushMessage {
    /// Sent once on connect, carrying the last completed cycle.
    Initial { data: CycleSnapshot, timestamp: u64 },
    /// Sent after every completed cycle.
    Update { data: CycleSnapshot, timestamp: u64 },
    /// Sent when the whole frame fetch failed for a cycle.
    Error { message: String, timestamp: u64 },
}
