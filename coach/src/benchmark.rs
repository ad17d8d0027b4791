//! Fixed-strength baselines for tracking progress of a promoted evaluator.

use std::sync::Arc;

use anyhow::Result;
use engine_core::GameState;
use mcts::{
    ActionSelector, AlphaBetaSelector, Evaluator, ExactConfig, GuidedMctsSelector, MctsConfig,
    MinimaxSelector, RandomSelector, RolloutConfig, RolloutMctsSelector,
};
use serde::Serialize;
use tracing::info;

use crate::arena::{Arena, ArenaConfig, ArenaReport};

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    /// Games per baseline
    pub games: u32,
    pub rollout: RolloutConfig,
    /// Settings for the minimax baseline; a depth limit makes it beatable
    pub exact: ExactConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            games: 10,
            rollout: RolloutConfig::default(),
            exact: ExactConfig::default().with_transposition_table(),
        }
    }
}

/// Score of the benchmarked evaluator against one baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineReport {
    pub baseline: String,
    pub report: ArenaReport,
}

/// The baseline opponents: uniform random, perfect play, rollout search
/// and configurable minimax.
pub fn baselines<S: GameState>(
    config: &BenchmarkConfig,
    seed: u64,
) -> Vec<Box<dyn ActionSelector<S> + Send>> {
    vec![
        Box::new(RandomSelector::new(seed)),
        Box::new(AlphaBetaSelector::new()),
        Box::new(RolloutMctsSelector::new(
            config.rollout.clone(),
            seed.wrapping_add(1),
        )),
        Box::new(MinimaxSelector::new(config.exact.clone())),
    ]
}

/// Play `evaluator` at temperature 0 against every baseline.
///
/// Reports are informational only; nothing here feeds back into training.
pub fn run_baselines<S, E>(
    evaluator: Arc<E>,
    mcts: &MctsConfig,
    config: &BenchmarkConfig,
    seed: u64,
) -> Result<Vec<BaselineReport>>
where
    S: GameState + Default,
    E: Evaluator<S> + ?Sized,
{
    let arena = Arena::new(ArenaConfig::default().with_games(config.games).with_temperature(0.0))?;
    let mut subject = GuidedMctsSelector::new(
        evaluator,
        mcts.clone().with_temperature(0.0),
        seed.wrapping_add(2),
    )
    .with_name("incumbent");

    let mut reports = Vec::new();
    for mut baseline in baselines::<S>(config, seed) {
        let report = arena.evaluate::<S, _, _>(&mut subject, baseline.as_mut())?;
        info!(
            baseline = baseline.name(),
            average = report.average,
            wins = report.wins,
            draws = report.draws,
            losses = report.losses,
            "Benchmark result"
        );
        reports.push(BaselineReport {
            baseline: baseline.name().to_string(),
            report,
        });
    }
    Ok(reports)
}
