//! Self-play data generation.
//!
//! The incumbent evaluator plays full games against itself with guided
//! search. Every ply records the mover-relative planes and the search
//! policy; once the game ends each example receives the outcome from its
//! own mover's perspective.

use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use engine_core::{Example, GameState, History};
use indicatif::{ProgressBar, ProgressStyle};
use mcts::{Evaluator, MctsConfig, MctsSearch, SearchStats};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Settings for one self-play batch.
#[derive(Debug, Clone)]
pub struct SelfPlayConfig {
    /// Games per batch
    pub games: u32,
    /// Parallel workers on the blocking pool
    pub workers: usize,
    /// Search settings; `temperature` must be positive for varied games
    pub mcts: MctsConfig,
    /// Base seed; game `i` uses a stream derived from it
    pub seed: u64,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            games: 20,
            workers: 4,
            mcts: MctsConfig::for_training(),
            seed: 42,
        }
    }
}

impl SelfPlayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.games == 0 {
            return Err(anyhow!("self-play games must be greater than 0"));
        }
        if self.workers == 0 {
            return Err(anyhow!("self-play workers must be greater than 0"));
        }
        if self.mcts.temperature <= 0.0 {
            return Err(anyhow!(
                "self-play temperature must be positive, got {}",
                self.mcts.temperature
            ));
        }
        self.mcts.validate()?;
        Ok(())
    }
}

/// One finished self-play game.
#[derive(Debug, Clone)]
pub struct GameRecord<S> {
    pub examples: Vec<Example>,
    pub final_state: S,
    /// Search counters summed over every move of the game
    pub evaluator_calls: u32,
    pub degenerate_policies: u32,
}

impl<S> GameRecord<S> {
    pub fn plies(&self) -> usize {
        self.examples.len()
    }
}

/// Fill in example outcomes once a game has ended.
///
/// The last mover scores +1 if `final_state` is a loss for the side to move
/// and 0 on a draw. Walking backward, the sign flips every ply, so the
/// example `i` plies before the end carries `v * (-1)^i`.
pub fn assign_outcomes<S: GameState>(examples: &mut [Example], final_state: &S) {
    let decisive = final_state.is_loss();
    for (i, example) in examples.iter_mut().rev().enumerate() {
        example.outcome = match (decisive, i % 2 == 0) {
            (false, _) => 0.0,
            (true, true) => 1.0,
            (true, false) => -1.0,
        };
    }
}

/// Play one game from `initial` with guided search at every ply.
pub fn play_game<S, E, R>(
    initial: S,
    evaluator: &E,
    config: &MctsConfig,
    rng: &mut R,
) -> Result<GameRecord<S>>
where
    S: GameState,
    E: Evaluator<S> + ?Sized,
    R: Rng + ?Sized,
{
    let mut state = initial;
    let mut examples = Vec::new();
    let mut totals = SearchStats::default();

    while !state.is_terminal() {
        let mut search = MctsSearch::new(evaluator, config.clone(), state.clone())?;
        let result = search.run(rng)?;

        totals.evaluator_calls += result.stats.evaluator_calls;
        totals.degenerate_policies += result.stats.degenerate_policies;

        examples.push(Example::new(&state, result.policy));
        state = state
            .next(result.action)
            .with_context(|| format!("search proposed illegal action {}", result.action))?;
    }

    assign_outcomes(&mut examples, &state);

    Ok(GameRecord {
        examples,
        final_state: state,
        evaluator_calls: totals.evaluator_calls,
        degenerate_policies: totals.degenerate_policies,
    })
}

/// Seed for game `index` of a batch.
pub fn game_seed(base: u64, index: u32) -> u64 {
    base.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Runs self-play batches for one evaluator.
pub struct SelfPlayEngine<S, E: ?Sized> {
    evaluator: Arc<E>,
    config: SelfPlayConfig,
    _game: PhantomData<fn() -> S>,
}

impl<S, E> SelfPlayEngine<S, E>
where
    S: GameState + Default,
    E: Evaluator<S> + ?Sized + 'static,
{
    pub fn new(evaluator: Arc<E>, config: SelfPlayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            evaluator,
            config,
            _game: PhantomData,
        })
    }

    pub fn config(&self) -> &SelfPlayConfig {
        &self.config
    }

    /// Play game `index` of the batch. Deterministic for a given seed.
    pub fn play_game(&self, index: u32) -> Result<GameRecord<S>> {
        let mut rng = ChaCha20Rng::seed_from_u64(game_seed(self.config.seed, index));
        play_game(S::default(), &*self.evaluator, &self.config.mcts, &mut rng)
    }

    /// Play the configured number of games on the worker pool and
    /// concatenate their examples in game order.
    pub async fn run_batch(&self) -> Result<History> {
        let games = self.config.games;
        let workers = self.config.workers.min(games as usize).max(1);

        info!(
            games,
            workers,
            simulations = self.config.mcts.num_simulations,
            temperature = self.config.mcts.temperature,
            "Starting self-play batch"
        );

        // Progress bar only when stderr is a TTY
        let progress = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
            let pb = ProgressBar::new(games as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} games ({eta})")
                    .map_err(|e| anyhow!("invalid progress template: {}", e))?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let evaluator = Arc::clone(&self.evaluator);
            let config = self.config.clone();
            let progress = progress.clone();

            tasks.spawn_blocking(move || -> Result<Vec<(u32, GameRecord<S>)>> {
                let engine = SelfPlayEngine::<S, E> {
                    evaluator,
                    config,
                    _game: PhantomData,
                };
                let mut records = Vec::new();
                for index in (worker as u32..games).step_by(workers) {
                    let record = engine
                        .play_game(index)
                        .with_context(|| format!("self-play game {} failed", index))?;
                    debug!(
                        worker,
                        game = index,
                        plies = record.plies(),
                        "Self-play game finished"
                    );
                    if let Some(ref pb) = progress {
                        pb.inc(1);
                    }
                    records.push((index, record));
                }
                Ok(records)
            });
        }

        let mut records = Vec::with_capacity(games as usize);
        while let Some(joined) = tasks.join_next().await {
            records.extend(joined.context("self-play worker panicked")??);
        }
        records.sort_by_key(|(index, _)| *index);

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let mut history = History::new();
        let mut evaluator_calls = 0u64;
        let mut degenerate = 0u64;
        for (_, record) in records {
            evaluator_calls += record.evaluator_calls as u64;
            degenerate += record.degenerate_policies as u64;
            history.extend(record.examples);
        }

        info!(
            games,
            examples = history.len(),
            evaluator_calls,
            degenerate_policies = degenerate,
            "Self-play batch complete"
        );

        Ok(history)
    }
}
