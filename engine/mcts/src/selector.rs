//! Move-choice policies with a common interface.
//!
//! Every search engine is wrapped as an [`ActionSelector`] so the arena and
//! the benchmarks can pit any two of them against each other. Selectors own
//! their RNG, seeded at construction.

use std::sync::Arc;

use engine_core::{random_action, Action, GameState};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::config::{ExactConfig, MctsConfig, RolloutConfig};
use crate::evaluator::Evaluator;
use crate::exact::{alpha_beta_action, Minimax};
use crate::rollout::RolloutSearch;
use crate::search::{MctsSearch, SearchError};

/// Something that picks a move in a position.
pub trait ActionSelector<S: GameState> {
    /// Short label for logs and reports.
    fn name(&self) -> &str;

    /// Choose a legal action for the side to move in `state`.
    fn select(&mut self, state: &S) -> Result<Action, SearchError>;
}

impl<S: GameState, T: ActionSelector<S> + ?Sized> ActionSelector<S> for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn select(&mut self, state: &S) -> Result<Action, SearchError> {
        (**self).select(state)
    }
}

/// Uniformly random legal moves.
#[derive(Debug, Clone)]
pub struct RandomSelector {
    rng: ChaCha20Rng,
}

impl RandomSelector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl<S: GameState> ActionSelector<S> for RandomSelector {
    fn name(&self) -> &str {
        "random"
    }

    fn select(&mut self, state: &S) -> Result<Action, SearchError> {
        random_action(state, &mut self.rng).ok_or(SearchError::NoLegalMoves)
    }
}

/// Plain or memoised minimax.
#[derive(Debug, Default)]
pub struct MinimaxSelector {
    searcher: Minimax,
}

impl MinimaxSelector {
    pub fn new(config: ExactConfig) -> Self {
        Self {
            searcher: Minimax::new(config),
        }
    }
}

impl<S: GameState> ActionSelector<S> for MinimaxSelector {
    fn name(&self) -> &str {
        "minimax"
    }

    fn select(&mut self, state: &S) -> Result<Action, SearchError> {
        self.searcher.best_action(state)
    }
}

/// Full-depth alpha-beta.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaBetaSelector;

impl AlphaBetaSelector {
    pub fn new() -> Self {
        Self
    }
}

impl<S: GameState> ActionSelector<S> for AlphaBetaSelector {
    fn name(&self) -> &str {
        "alpha_beta"
    }

    fn select(&mut self, state: &S) -> Result<Action, SearchError> {
        alpha_beta_action(state)
    }
}

/// Rollout (UCB1) tree search.
#[derive(Debug, Clone)]
pub struct RolloutMctsSelector {
    config: RolloutConfig,
    rng: ChaCha20Rng,
}

impl RolloutMctsSelector {
    pub fn new(config: RolloutConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl<S: GameState> ActionSelector<S> for RolloutMctsSelector {
    fn name(&self) -> &str {
        "rollout_mcts"
    }

    fn select(&mut self, state: &S) -> Result<Action, SearchError> {
        let mut search = RolloutSearch::new(self.config.clone(), state.clone())?;
        Ok(search.run(&mut self.rng)?.action)
    }
}

/// Evaluator-guided (PUCT) tree search.
pub struct GuidedMctsSelector<E: ?Sized> {
    name: String,
    evaluator: Arc<E>,
    config: MctsConfig,
    rng: ChaCha20Rng,
}

impl<E: ?Sized> GuidedMctsSelector<E> {
    pub fn new(evaluator: Arc<E>, config: MctsConfig, seed: u64) -> Self {
        Self {
            name: "guided_mcts".to_string(),
            evaluator,
            config,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Override the report label, e.g. `"candidate"`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }
}

impl<S: GameState, E: Evaluator<S> + ?Sized> ActionSelector<S> for GuidedMctsSelector<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn select(&mut self, state: &S) -> Result<Action, SearchError> {
        let mut search = MctsSearch::new(&*self.evaluator, self.config.clone(), state.clone())?;
        Ok(search.run(&mut self.rng)?.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::UniformEvaluator;
    use games_tictactoe::{play_moves, State};

    fn selectors() -> Vec<Box<dyn ActionSelector<State>>> {
        vec![
            Box::new(RandomSelector::new(1)),
            Box::new(MinimaxSelector::new(
                ExactConfig::default().with_transposition_table(),
            )),
            Box::new(AlphaBetaSelector::new()),
            Box::new(RolloutMctsSelector::new(RolloutConfig::default(), 2)),
            Box::new(GuidedMctsSelector::new(
                Arc::new(UniformEvaluator::new()),
                MctsConfig::for_evaluation(),
                3,
            )),
        ]
    }

    #[test]
    fn test_every_selector_returns_legal_moves() {
        let state = play_moves(&[4, 0]).unwrap();
        for mut selector in selectors() {
            let action = selector.select(&state).unwrap();
            assert!(
                state.legal_actions().contains(&action),
                "{} picked illegal {}",
                selector.name(),
                action
            );
        }
    }

    #[test]
    fn test_every_selector_rejects_finished_games() {
        let lost = play_moves(&[0, 3, 1, 4, 2]).unwrap();
        for mut selector in selectors() {
            assert!(
                selector.select(&lost).is_err(),
                "{} accepted a finished game",
                selector.name()
            );
        }
    }

    #[test]
    fn test_search_selectors_take_immediate_win() {
        let state = play_moves(&[0, 3, 1, 4]).unwrap();
        for mut selector in selectors().into_iter().skip(1) {
            assert_eq!(selector.select(&state).unwrap(), 2, "{}", selector.name());
        }
    }

    #[test]
    fn test_random_selector_is_seeded() {
        let state = State::new();
        let mut a = RandomSelector::new(9);
        let mut b = RandomSelector::new(9);
        for _ in 0..10 {
            assert_eq!(
                ActionSelector::<State>::select(&mut a, &state).unwrap(),
                ActionSelector::<State>::select(&mut b, &state).unwrap()
            );
        }
    }

    #[test]
    fn test_guided_selector_name() {
        let selector =
            GuidedMctsSelector::new(Arc::new(UniformEvaluator::new()), MctsConfig::default(), 0)
                .with_name("candidate");
        assert_eq!(ActionSelector::<State>::name(&selector), "candidate");
    }
}
