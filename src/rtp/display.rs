//! Direct-display derivation: no shrinkage, no sample-size context. The
//! decoded magnitude/sign pair becomes a raw signed percentage for display
//! against the 96% theoretical baseline.
//!
//! Note the scale: this pipeline divides basis points by 100 (percentage
//! points), not by 10_000 then 100 as the Bayesian pipeline does. The two
//! are different consumers with different semantics and stay separate.

use crate::rtp::sign::display_percent;
use crate::rtp::DeriveMetrics;
use crate::types::{GameContext, MergedGame, ProcessedGame, Trend};

pub struct DirectDisplayEngine {
    pub context: GameContext,
    pub asset_base_url: String,
}

impl DirectDisplayEngine {
    pub fn new(asset_base_url: String) -> Self {
        Self { context: GameContext::default(), asset_base_url }
    }
}

impl DeriveMetrics for DirectDisplayEngine {
    fn process(&self, game: &MergedGame) -> ProcessedGame {
        ProcessedGame {
            game_id: game.game_id.clone(),
            game_name: game.game_name.clone(),
            provider: game.provider.clone(),
            image_path: game.image_path.clone(),
            image_url: game
                .image_path
                .as_ref()
                .map(|p| format!("{}{}", self.asset_base_url, p)),
            rtp_teorico: self.context.rtp_teorico,
            volatility: self.context.volatility,
            has_progressive: self.context.has_progressive,
            daily: None,
            weekly: None,
            trend: Trend::Stable,
            rtp_calculated_daily: display_percent(game.magnitude_bps_daily, game.sign_daily),
            rtp_calculated_weekly: display_percent(game.magnitude_bps_weekly, game.sign_weekly),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_signed_percentages_without_shrinkage() {
        let engine = DirectDisplayEngine::new("https://cgg.bet.br".to_string());
        let game = MergedGame {
            game_id: "7".to_string(),
            game_name: "Big Bass Bonanza".to_string(),
            provider: None,
            image_path: Some("/static/games/bass.png".to_string()),
            magnitude_bps_daily: Some(150),
            sign_daily: Some(1),
            magnitude_bps_weekly: Some(220),
            sign_weekly: Some(-1),
        };
        let processed = engine.process(&game);
        assert_eq!(processed.rtp_calculated_daily, Some(1.5));
        assert_eq!(processed.rtp_calculated_weekly, Some(-2.2));
        assert!(processed.daily.is_none());
        assert!(processed.weekly.is_none());
        assert_eq!(processed.trend, Trend::Stable);
        assert_eq!(
            processed.image_url.as_deref(),
            Some("https://cgg.bet.br/static/games/bass.png")
        );
    }

    #[test]
    fn missing_window_stays_none() {
        let engine = DirectDisplayEngine::new(String::new());
        let game = MergedGame {
            game_id: "8".to_string(),
            game_name: "Starburst".to_string(),
            provider: None,
            image_path: None,
            magnitude_bps_daily: None,
            sign_daily: None,
            magnitude_bps_weekly: Some(100),
            sign_weekly: Some(1),
        };
        let processed = engine.process(&game);
        assert_eq!(processed.rtp_calculated_daily, None);
        assert_eq!(processed.rtp_calculated_weekly, Some(1.0));
    }
}
