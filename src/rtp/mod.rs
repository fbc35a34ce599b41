//! RTP derivation: the two pipelines (Bayesian and direct-display) behind a
//! shared strategy trait, plus the sign interpreter and ranking engine.

pub mod bayes;
pub mod display;
pub mod ranking;
pub mod sign;

use crate::types::{MergedGame, ProcessedGame};

/// A derivation strategy turning one merged game into processed output.
/// The caller selects the strategy per `Pipeline`; the two implementations
/// use different basis-point scalings and are never collapsed.
pub trait DeriveMetrics: Send + Sync {
    fn process(&self, game: &MergedGame) -> ProcessedGame;
}

pub use bayes::BayesianEngine;
pub use display::DirectDisplayEngine;
