//! Bayesian RTP derivation: shrink sparse observations toward the
//! theoretical RTP in proportion to sample size, then score and label them.

use crate::rtp::sign::statistical_fraction;
use crate::rtp::DeriveMetrics;
use crate::types::{
    Confidence, GameContext, GameWindow, MergedGame, ProcessedGame, Trend, Volatility,
    WindowMetrics,
};

/// Spins at or above which a sample is high confidence.
pub const CONFIDENCE_HIGH_SPINS: u64 = 50_000;
/// Spins at or above which a sample is medium confidence.
pub const CONFIDENCE_MEDIUM_SPINS: u64 = 10_000;

/// Progressive-jackpot clamp on the posterior delta, in percentage points.
/// One jackpot hit must not read as an implausible long-run deviation.
const PROGRESSIVE_CLAMP_PP: f64 = 2.0;

/// Trend threshold in percentage points of 24h-vs-7d posterior delta.
const TREND_THRESHOLD_PP: f64 = 0.5;

/// Observed RTP from the theoretical baseline plus the decoded
/// magnitude/sign pair. Either input absent means no signal: the
/// theoretical RTP is returned unchanged.
pub fn observed_rtp(rtp_teorico: f64, magnitude_bps: Option<u64>, sign: Option<i8>) -> f64 {
    let (Some(bps), Some(sign)) = (magnitude_bps, sign) else {
        return rtp_teorico;
    };
    let delta = statistical_fraction(bps);
    match sign {
        s if s < 0 => rtp_teorico - delta,
        s if s > 0 => rtp_teorico + delta,
        _ => rtp_teorico,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdjustmentInput {
    pub rtp_teorico: f64,
    pub rtp_observado: f64,
    pub n_spins: u64,
    pub volatility: Volatility,
    pub has_progressive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    pub rtp_post: f64,
    pub delta_post_pp: f64,
}

/// Shrink the observed RTP toward the prior. With no sample-size signal
/// (`n_spins == 0`) the observation passes through untouched; shrinkage
/// would zero the delta and hide every deviation.
pub fn bayesian_adjustment(input: AdjustmentInput) -> Adjustment {
    let clamp = |delta_pp: f64| {
        if input.has_progressive {
            delta_pp.clamp(-PROGRESSIVE_CLAMP_PP, PROGRESSIVE_CLAMP_PP)
        } else {
            delta_pp
        }
    };

    if input.n_spins == 0 {
        return Adjustment {
            rtp_post: input.rtp_observado,
            delta_post_pp: clamp((input.rtp_observado - input.rtp_teorico) * 100.0),
        };
    }

    let k = input.volatility.prior_strength();
    let n = input.n_spins as f64;
    let w = n / (n + k);
    let rtp_post = input.rtp_teorico + w * (input.rtp_observado - input.rtp_teorico);

    Adjustment {
        rtp_post,
        delta_post_pp: clamp((rtp_post - input.rtp_teorico) * 100.0),
    }
}

/// Deviation magnitude discounted by statistical confidence; the discount
/// saturates at 1 once `n_spins >= k`.
pub fn score(delta_post_pp: f64, n_spins: u64, volatility: Volatility) -> f64 {
    let k = volatility.prior_strength();
    delta_post_pp * (n_spins as f64 / k).sqrt().min(1.0)
}

pub fn confidence(n_spins: u64) -> Confidence {
    if n_spins >= CONFIDENCE_HIGH_SPINS {
        Confidence::High
    } else if n_spins >= CONFIDENCE_MEDIUM_SPINS {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Trend from the two windows' posterior deltas. Null-safe: either absent
/// means stable.
pub fn trend(delta_post_24h: Option<f64>, delta_post_7d: Option<f64>) -> Trend {
    let (Some(d24), Some(d7)) = (delta_post_24h, delta_post_7d) else {
        return Trend::Stable;
    };
    let diff = d24 - d7;
    if diff > TREND_THRESHOLD_PP {
        Trend::Rising
    } else if diff < -TREND_THRESHOLD_PP {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Derive metrics for one window; None when the magnitude/sign pair is
/// incomplete (no signal, falls back to theoretical with no delta).
fn window_metrics(
    window: GameWindow,
    magnitude_bps: Option<u64>,
    sign: Option<i8>,
    n_spins: u64,
    ctx: &GameContext,
) -> Option<WindowMetrics> {
    let (bps, sign) = (magnitude_bps?, sign?);

    let rtp_observado = observed_rtp(ctx.rtp_teorico, Some(bps), Some(sign));
    let adj = bayesian_adjustment(AdjustmentInput {
        rtp_teorico: ctx.rtp_teorico,
        rtp_observado,
        n_spins,
        volatility: ctx.volatility,
        has_progressive: ctx.has_progressive,
    });

    Some(WindowMetrics {
        window,
        magnitude_bps: bps,
        sign,
        n_spins,
        rtp_observado,
        rtp_post: adj.rtp_post,
        delta_post_pp: adj.delta_post_pp,
        score: score(adj.delta_post_pp, n_spins, ctx.volatility),
        confidence: confidence(n_spins),
    })
}

/// The Bayesian derivation strategy. Holds the context applied to every
/// game; a per-game context source can replace `default_context` once the
/// operator exposes volatility or spin counts.
pub struct BayesianEngine {
    pub default_context: GameContext,
    pub asset_base_url: String,
}

impl BayesianEngine {
    pub fn new(asset_base_url: String) -> Self {
        Self { default_context: GameContext::default(), asset_base_url }
    }
}

impl DeriveMetrics for BayesianEngine {
    fn process(&self, game: &MergedGame) -> ProcessedGame {
        let ctx = &self.default_context;

        let daily = window_metrics(
            GameWindow::Daily,
            game.magnitude_bps_daily,
            game.sign_daily,
            ctx.n_spins_daily,
            ctx,
        );
        let weekly = window_metrics(
            GameWindow::Weekly,
            game.magnitude_bps_weekly,
            game.sign_weekly,
            ctx.n_spins_weekly,
            ctx,
        );

        // Trend requires both windows; otherwise stable.
        let trend = match (&daily, &weekly) {
            (Some(d), Some(w)) => trend(Some(d.delta_post_pp), Some(w.delta_post_pp)),
            _ => Trend::Stable,
        };

        ProcessedGame {
            game_id: game.game_id.clone(),
            game_name: game.game_name.clone(),
            provider: game.provider.clone(),
            image_path: game.image_path.clone(),
            image_url: game
                .image_path
                .as_ref()
                .map(|p| format!("{}{}", self.asset_base_url, p)),
            rtp_teorico: ctx.rtp_teorico,
            volatility: ctx.volatility,
            has_progressive: ctx.has_progressive,
            daily,
            weekly,
            trend,
            rtp_calculated_daily: None,
            rtp_calculated_weekly: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged(daily: Option<(u64, i8)>, weekly: Option<(u64, i8)>) -> MergedGame {
        MergedGame {
            game_id: "12345".to_string(),
            game_name: "Sweet Bonanza".to_string(),
            provider: Some("Pragmatic Play".to_string()),
            image_path: None,
            magnitude_bps_daily: daily.map(|(m, _)| m),
            sign_daily: daily.map(|(_, s)| s),
            magnitude_bps_weekly: weekly.map(|(m, _)| m),
            sign_weekly: weekly.map(|(_, s)| s),
        }
    }

    #[test]
    fn observed_rtp_end_to_end_value() {
        let rtp = observed_rtp(0.96, Some(20_335), Some(-1));
        assert!((rtp - 0.939665).abs() < 1e-12);
    }

    #[test]
    fn observed_rtp_null_safe() {
        assert_eq!(observed_rtp(0.96, None, Some(1)), 0.96);
        assert_eq!(observed_rtp(0.96, Some(100), None), 0.96);
        assert_eq!(observed_rtp(0.96, Some(100), Some(0)), 0.96);
    }

    #[test]
    fn zero_spins_passes_observation_through() {
        for vol in [
            Volatility::Low,
            Volatility::Medium,
            Volatility::High,
            Volatility::VeryHigh,
        ] {
            let adj = bayesian_adjustment(AdjustmentInput {
                rtp_teorico: 0.96,
                rtp_observado: 0.939665,
                n_spins: 0,
                volatility: vol,
                has_progressive: false,
            });
            assert_eq!(adj.rtp_post, 0.939665, "volatility {vol}");
            assert!((adj.delta_post_pp - (-2.0335)).abs() < 1e-9);
        }
    }

    #[test]
    fn shrinkage_pulls_toward_prior() {
        let adj = bayesian_adjustment(AdjustmentInput {
            rtp_teorico: 0.96,
            rtp_observado: 0.98,
            n_spins: 100_000,
            volatility: Volatility::Medium, // k = 100_000 → w = 0.5
            has_progressive: false,
        });
        assert!((adj.rtp_post - 0.97).abs() < 1e-12);
        assert!((adj.delta_post_pp - 1.0).abs() < 1e-9);
    }

    #[test]
    fn progressive_clamps_the_delta() {
        let adj = bayesian_adjustment(AdjustmentInput {
            rtp_teorico: 0.96,
            rtp_observado: 1.02, // +6 pp raw
            n_spins: 0,
            volatility: Volatility::High,
            has_progressive: true,
        });
        assert_eq!(adj.delta_post_pp, 2.0);

        let adj = bayesian_adjustment(AdjustmentInput {
            rtp_teorico: 0.96,
            rtp_observado: 0.90,
            n_spins: 0,
            volatility: Volatility::High,
            has_progressive: true,
        });
        assert_eq!(adj.delta_post_pp, -2.0);
    }

    #[test]
    fn score_saturates_at_prior_strength() {
        // n == k → factor 1
        let s = score(1.5, 100_000, Volatility::Medium);
        assert!((s - 1.5).abs() < 1e-12);
        // n beyond k stays saturated
        let s = score(1.5, 400_000, Volatility::Medium);
        assert!((s - 1.5).abs() < 1e-12);
        // quarter of k → factor 0.5
        let s = score(1.5, 25_000, Volatility::Medium);
        assert!((s - 0.75).abs() < 1e-12);
        // zero spins → zero score
        assert_eq!(score(1.5, 0, Volatility::Medium), 0.0);
    }

    #[test]
    fn confidence_thresholds() {
        assert_eq!(confidence(0), Confidence::Low);
        assert_eq!(confidence(9_999), Confidence::Low);
        assert_eq!(confidence(10_000), Confidence::Medium);
        assert_eq!(confidence(49_999), Confidence::Medium);
        assert_eq!(confidence(50_000), Confidence::High);
    }

    #[test]
    fn trend_boundaries() {
        assert_eq!(trend(Some(1.0), Some(0.4)), Trend::Rising); // diff 0.6
        assert_eq!(trend(Some(1.0), Some(0.6)), Trend::Stable); // diff 0.4
        assert_eq!(trend(Some(0.4), Some(1.0)), Trend::Falling); // diff -0.6
        assert_eq!(trend(None, Some(1.0)), Trend::Stable);
        assert_eq!(trend(Some(1.0), None), Trend::Stable);
    }

    #[test]
    fn process_game_single_window_is_stable() {
        let engine = BayesianEngine::new("https://cgg.bet.br".to_string());
        let game = engine.process(&merged(Some((20_335, -1)), None));
        assert!(game.daily.is_some());
        assert!(game.weekly.is_none());
        assert_eq!(game.trend, Trend::Stable);

        let daily = game.daily.unwrap();
        assert!((daily.rtp_observado - 0.939665).abs() < 1e-12);
        // n_spins=0 → posterior equals observation
        assert_eq!(daily.rtp_post, daily.rtp_observado);
        assert_eq!(daily.confidence, Confidence::Low);
    }

    #[test]
    fn process_game_both_windows_computes_trend() {
        let engine = BayesianEngine::new("https://cgg.bet.br".to_string());
        // daily +2.0335 pp, weekly -2.0335 pp → diff 4.067 → rising
        let game = engine.process(&merged(Some((20_335, 1)), Some((20_335, -1))));
        assert_eq!(game.trend, Trend::Rising);
    }

    #[test]
    fn incomplete_sign_magnitude_pair_is_no_signal() {
        let engine = BayesianEngine::new(String::new());
        let mut game = merged(Some((20_335, -1)), None);
        game.sign_daily = None; // magnitude without sign
        let processed = engine.process(&game);
        assert!(processed.daily.is_none());
    }
}
