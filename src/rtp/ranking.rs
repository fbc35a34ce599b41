//! Best/worst leaderboards per time window.

use std::cmp::Ordering;

use crate::types::{
    Confidence, GameWindow, ProcessedGame, RankType, RankingEntry, Rankings, Volatility,
};

struct Candidate<'a> {
    game: &'a ProcessedGame,
    score: f64,
    delta_post_pp: f64,
    confidence: Confidence,
    n_spins: u64,
    volatility: Volatility,
}

/// Rank games with metrics for `window` into best/worst leaderboards of at
/// most `limit` entries each. Low-confidence games are excluded entirely,
/// not ranked lower. The tie-break chain (score, then n_spins desc, then
/// volatility tier asc) yields a deterministic total order.
pub fn generate_rankings(games: &[ProcessedGame], window: GameWindow, limit: usize) -> Rankings {
    let mut candidates: Vec<Candidate<'_>> = games
        .iter()
        .filter_map(|game| {
            let metrics = match window {
                GameWindow::Daily => game.daily.as_ref(),
                GameWindow::Weekly => game.weekly.as_ref(),
            }?;
            if metrics.confidence == Confidence::Low {
                return None;
            }
            Some(Candidate {
                game,
                score: metrics.score,
                delta_post_pp: metrics.delta_post_pp,
                confidence: metrics.confidence,
                n_spins: metrics.n_spins,
                volatility: game.volatility,
            })
        })
        .collect();

    candidates.sort_by(compare_best);
    let best = take_entries(&candidates, RankType::Best, limit);

    candidates.sort_by(compare_worst);
    let worst = take_entries(&candidates, RankType::Worst, limit);

    Rankings { best, worst }
}

fn tie_break(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.n_spins
        .cmp(&a.n_spins)
        .then_with(|| a.volatility.tier_order().cmp(&b.volatility.tier_order()))
        .then_with(|| a.game.game_id.cmp(&b.game.game_id))
}

fn compare_best(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| tie_break(a, b))
}

fn compare_worst(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.score.total_cmp(&b.score).then_with(|| tie_break(a, b))
}

fn take_entries(sorted: &[Candidate<'_>], rank_type: RankType, limit: usize) -> Vec<RankingEntry> {
    sorted
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, c)| RankingEntry {
            game_id: c.game.game_id.clone(),
            game_name: c.game.game_name.clone(),
            provider: c.game.provider.clone(),
            rank_type,
            position: (i + 1) as u32,
            score: c.score,
            delta_post_pp: c.delta_post_pp,
            confidence: c.confidence,
            n_spins: c.n_spins,
            volatility: c.volatility,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Trend, WindowMetrics};

    fn game(
        id: &str,
        score: f64,
        n_spins: u64,
        confidence: Confidence,
        volatility: Volatility,
    ) -> ProcessedGame {
        ProcessedGame {
            game_id: id.to_string(),
            game_name: format!("Game {id}"),
            provider: None,
            image_path: None,
            image_url: None,
            rtp_teorico: 0.96,
            volatility,
            has_progressive: false,
            daily: Some(WindowMetrics {
                window: GameWindow::Daily,
                magnitude_bps: 100,
                sign: 1,
                n_spins,
                rtp_observado: 0.97,
                rtp_post: 0.97,
                delta_post_pp: score,
                score,
                confidence,
            }),
            weekly: None,
            trend: Trend::Stable,
            rtp_calculated_daily: None,
            rtp_calculated_weekly: None,
        }
    }

    #[test]
    fn orders_best_descending_and_worst_ascending() {
        let games = vec![
            game("a", 1.0, 60_000, Confidence::High, Volatility::Medium),
            game("b", -2.0, 60_000, Confidence::High, Volatility::Medium),
            game("c", 3.0, 60_000, Confidence::High, Volatility::Medium),
        ];
        let r = generate_rankings(&games, GameWindow::Daily, 10);

        let best_ids: Vec<_> = r.best.iter().map(|e| e.game_id.as_str()).collect();
        assert_eq!(best_ids, ["c", "a", "b"]);
        let worst_ids: Vec<_> = r.worst.iter().map(|e| e.game_id.as_str()).collect();
        assert_eq!(worst_ids, ["b", "a", "c"]);

        assert_eq!(r.best[0].position, 1);
        assert_eq!(r.best[2].position, 3);
        assert_eq!(r.best[0].rank_type, RankType::Best);
        assert_eq!(r.worst[0].rank_type, RankType::Worst);
    }

    #[test]
    fn low_confidence_is_excluded_regardless_of_score() {
        let games = vec![
            game("huge", 99.0, 500, Confidence::Low, Volatility::Medium),
            game("ok", 1.0, 60_000, Confidence::High, Volatility::Medium),
        ];
        let r = generate_rankings(&games, GameWindow::Daily, 10);
        assert_eq!(r.best.len(), 1);
        assert_eq!(r.worst.len(), 1);
        assert_eq!(r.best[0].game_id, "ok");
        assert!(r.worst.iter().all(|e| e.game_id != "huge"));
    }

    #[test]
    fn ties_break_on_spins_then_volatility() {
        let games = vec![
            game("few_spins", 1.0, 20_000, Confidence::Medium, Volatility::Medium),
            game("many_spins", 1.0, 80_000, Confidence::High, Volatility::Medium),
            game("low_vol", 1.0, 20_000, Confidence::Medium, Volatility::Low),
        ];
        let r = generate_rankings(&games, GameWindow::Daily, 10);
        let ids: Vec<_> = r.best.iter().map(|e| e.game_id.as_str()).collect();
        // Equal scores: more spins first, then lower volatility tier.
        assert_eq!(ids, ["many_spins", "low_vol", "few_spins"]);
    }

    #[test]
    fn truncates_to_limit() {
        let games: Vec<_> = (0..20)
            .map(|i| {
                game(
                    &format!("g{i:02}"),
                    i as f64,
                    60_000,
                    Confidence::High,
                    Volatility::Medium,
                )
            })
            .collect();
        let r = generate_rankings(&games, GameWindow::Daily, 5);
        assert_eq!(r.best.len(), 5);
        assert_eq!(r.worst.len(), 5);
        assert_eq!(r.best[0].game_id, "g19");
        assert_eq!(r.worst[0].game_id, "g00");
    }

    #[test]
    fn games_without_the_window_are_skipped() {
        let mut g = game("daily_only", 1.0, 60_000, Confidence::High, Volatility::Medium);
        g.weekly = None;
        let r = generate_rankings(&[g], GameWindow::Weekly, 10);
        assert!(r.best.is_empty());
        assert!(r.worst.is_empty());
    }
}
