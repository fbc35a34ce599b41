//! HTTP client for the operator's binary live-RTP endpoint, plus the
//! daily+weekly merge.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{Config, REQUEST_LIMIT};
use crate::error::{AppError, Result};
use crate::types::{GameRecord, GameWindow, MergedGame};
use crate::wire::varint;

/// Result of one cycle's frame acquisition. A failed window is absent, not
/// fatal; `errors` carries what went wrong for cycle-level reporting.
#[derive(Debug, Default)]
pub struct FrameSet {
    pub daily: Option<Vec<u8>>,
    pub weekly: Option<Vec<u8>>,
    pub errors: Vec<String>,
}

impl FrameSet {
    pub fn all_failed(&self) -> bool {
        self.daily.is_none() && self.weekly.is_none()
    }
}

pub struct UpstreamClient {
    client: reqwest::Client,
    url: String,
    /// CloudFlare session cookies captured from responses. The endpoint
    /// answers anonymous requests, but replaying them avoids challenges.
    cookies: Mutex<Option<String>>,
}

impl UpstreamClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: cfg.upstream_url.clone(),
            cookies: Mutex::new(None),
        })
    }

    /// The fixed request body: `{field1: window_selector, field2: limit}`,
    /// i.e. `[0x08, sel, 0x10, 0x02]`.
    pub fn request_body(window: GameWindow) -> Vec<u8> {
        let mut body = Vec::with_capacity(4);
        varint::encode_field(1, window.selector(), &mut body);
        varint::encode_field(2, REQUEST_LIMIT, &mut body);
        body
    }

    /// POST one window's request and return the raw response bytes.
    pub async fn fetch_window(&self, window: GameWindow) -> Result<Vec<u8>> {
        let mut req = self
            .client
            .post(&self.url)
            .header("accept", "application/x-protobuf")
            .header("accept-language", "pt-BR")
            .header("content-type", "application/x-protobuf")
            .header("origin", "https://cgg.bet.br")
            .header("referer", "https://cgg.bet.br/pt-BR/casinos/casino/lobby")
            .header("x-language-iso", "pt-BR")
            .header(
                "user-agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36",
            )
            .body(Self::request_body(window));

        if let Some(cookie) = self.cookies.lock().ok().and_then(|c| c.clone()) {
            req = req.header("cookie", cookie);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Upstream(status.as_u16()));
        }

        if let Some(set_cookie) = resp
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut cookies) = self.cookies.lock() {
                *cookies = Some(set_cookie.to_string());
            }
        }

        let bytes = resp.bytes().await?;
        debug!(window = %window, len = bytes.len(), "frame fetched");
        Ok(bytes.to_vec())
    }

    /// Fetch both windows concurrently. Per-window failures are tolerated
    /// and reported; merging happens only after both resolve.
    pub async fn fetch_all(&self) -> FrameSet {
        let (daily, weekly) = tokio::join!(
            self.fetch_window(GameWindow::Daily),
            self.fetch_window(GameWindow::Weekly),
        );

        let mut set = FrameSet::default();
        match daily {
            Ok(bytes) => set.daily = Some(bytes),
            Err(e) => {
                warn!("daily frame fetch failed: {e}");
                set.errors.push(format!("24h: {e}"));
            }
        }
        match weekly {
            Ok(bytes) => set.weekly = Some(bytes),
            Err(e) => {
                warn!("weekly frame fetch failed: {e}");
                set.errors.push(format!("7d: {e}"));
            }
        }
        set
    }
}

/// Combine per-window records by game_id. A game present in both frames
/// appears exactly once with both windows populated; name, provider and
/// image come from whichever frame saw the game first. Records missing a
/// game_id or name never reach the merged set.
pub fn merge_windows(daily: Vec<GameRecord>, weekly: Vec<GameRecord>) -> Vec<MergedGame> {
    let mut merged: Vec<MergedGame> = Vec::with_capacity(daily.len() + weekly.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in daily {
        let (Some(game_id), Some(game_name)) = (record.game_id, record.game_name) else {
            continue;
        };
        index.insert(game_id.clone(), merged.len());
        merged.push(MergedGame {
            game_id,
            game_name,
            provider: record.provider,
            image_path: record.image_path,
            magnitude_bps_daily: record.magnitude_bps,
            sign_daily: record.sign,
            magnitude_bps_weekly: None,
            sign_weekly: None,
        });
    }

    for record in weekly {
        let (Some(game_id), Some(game_name)) = (record.game_id, record.game_name) else {
            continue;
        };
        if let Some(&i) = index.get(&game_id) {
            merged[i].magnitude_bps_weekly = record.magnitude_bps;
            merged[i].sign_weekly = record.sign;
        } else {
            index.insert(game_id.clone(), merged.len());
            merged.push(MergedGame {
                game_id,
                game_name,
                provider: record.provider,
                image_path: record.image_path,
                magnitude_bps_daily: None,
                sign_daily: None,
                magnitude_bps_weekly: record.magnitude_bps,
                sign_weekly: record.sign,
            });
        }
    }

    merged
}
