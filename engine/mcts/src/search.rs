//! Evaluator-guided (PUCT) tree search.
//!
//! Each simulation:
//! 1. Selection: descend with the PUCT rule, unvisited children first
//! 2. Expansion: evaluate the leaf once and add one child per legal action
//! 3. Backpropagation: push the leaf value to the root, negating per level
//!
//! Leaves are never rolled out; the evaluator's value stands in for the
//! outcome.

use std::time::{Duration, Instant};

use engine_core::{Action, GameError, GameState};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::MctsConfig;
use crate::evaluator::{legal_priors, Evaluator, EvaluatorError};
use crate::node::NodeId;
use crate::tree::MctsTree;

/// Errors that can occur during search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("No legal moves available")]
    NoLegalMoves,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Per-search counters.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub simulations: u32,
    pub evaluator_calls: u32,
    pub terminal_hits: u32,
    /// Expansions whose evaluator policy had no mass on legal actions
    pub degenerate_policies: u32,
    pub tree_size: usize,
    pub max_depth: u32,
    pub elapsed: Duration,
}

/// Result of a guided search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Chosen action
    pub action: Action,

    /// Policy over the full action space derived from root visit counts
    pub policy: Vec<f32>,

    /// Mean value at the root for its side to move
    pub value: f32,

    pub stats: SearchStats,
}

/// Guided search state for a single call.
pub struct MctsSearch<'a, S: GameState, E: Evaluator<S> + ?Sized> {
    tree: MctsTree<S>,
    evaluator: &'a E,
    config: MctsConfig,
    stats: SearchStats,
}

impl<'a, S: GameState, E: Evaluator<S> + ?Sized> MctsSearch<'a, S, E> {
    /// Create a new search rooted at `state`.
    pub fn new(evaluator: &'a E, config: MctsConfig, state: S) -> Result<Self, SearchError> {
        config.validate()?;

        if state.is_terminal() || state.legal_actions().is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        Ok(Self {
            tree: MctsTree::new(state),
            evaluator,
            config,
            stats: SearchStats::default(),
        })
    }

    /// Run the search for the configured number of simulations.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<SearchResult, SearchError> {
        let started = Instant::now();
        let root_id = self.tree.root();

        // The first simulation expands the root
        let value = self.expand_node(root_id)?;
        self.tree.backpropagate(root_id, value);
        self.stats.simulations = 1;

        if self.config.dirichlet_alpha > 0.0 && self.config.dirichlet_epsilon > 0.0 {
            self.add_dirichlet_noise(rng)?;
        }

        while self.stats.simulations < self.config.num_simulations {
            self.simulate()?;
            self.stats.simulations += 1;
        }

        let policy = self
            .tree
            .root_policy(S::NUM_ACTIONS, self.config.temperature);

        let action = if self.config.temperature < 1e-6 {
            self.tree
                .best_action()
                .map(|(a, _)| a)
                .ok_or(SearchError::NoLegalMoves)?
        } else {
            sample_action(&policy, rng)?
        };

        let tree_stats = self.tree.stats();
        self.stats.tree_size = tree_stats.total_nodes;
        self.stats.max_depth = tree_stats.max_depth;
        self.stats.elapsed = started.elapsed();

        trace!(
            action,
            value = tree_stats.root_value,
            simulations = self.stats.simulations,
            tree_size = self.stats.tree_size,
            "Guided search complete"
        );

        Ok(SearchResult {
            action,
            policy,
            value: tree_stats.root_value,
            stats: self.stats.clone(),
        })
    }

    /// Run a single simulation (select -> expand/evaluate -> backpropagate).
    fn simulate(&mut self) -> Result<(), SearchError> {
        let leaf_id = self.select();
        let leaf = self.tree.get(leaf_id);

        let value = if leaf.is_terminal {
            self.stats.terminal_hits += 1;
            leaf.terminal_value
        } else {
            self.expand_node(leaf_id)?
        };

        self.tree.backpropagate(leaf_id, value);
        Ok(())
    }

    /// Descend from the root to a terminal or unexpanded node.
    fn select(&self) -> NodeId {
        let mut current = self.tree.root();

        loop {
            let node = self.tree.get(current);
            if node.is_leaf() {
                return current;
            }

            match self.tree.select_child_puct(current, self.config.c_puct) {
                Some(child_id) => current = child_id,
                None => return current,
            }
        }
    }

    /// Evaluate a node, add one child per legal action, and return the
    /// evaluator's value for backpropagation.
    fn expand_node(&mut self, node_id: NodeId) -> Result<f32, SearchError> {
        let node = self.tree.get(node_id);
        if node.is_terminal {
            return Ok(node.terminal_value);
        }

        let state = node.state.clone();
        let legal = state.legal_actions();
        if legal.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let eval = self.evaluator.evaluate(&state)?;
        self.stats.evaluator_calls += 1;

        if eval.policy.len() != S::NUM_ACTIONS {
            return Err(EvaluatorError::InvalidState(format!(
                "policy has {} entries, expected {}",
                eval.policy.len(),
                S::NUM_ACTIONS
            ))
            .into());
        }

        let priors = match legal_priors(&eval.policy, &legal) {
            Some(priors) => priors,
            None => {
                self.stats.degenerate_policies += 1;
                debug!(
                    num_legal = legal.len(),
                    "Evaluator policy has no mass on legal actions, using uniform priors"
                );
                vec![1.0 / legal.len() as f32; legal.len()]
            }
        };

        for (action, prior) in legal.into_iter().zip(priors) {
            let child = state.next(action)?;
            self.tree.add_child(node_id, action, prior, child);
        }

        Ok(eval.value.clamp(-1.0, 1.0))
    }

    /// Mix Dirichlet noise into the root priors.
    fn add_dirichlet_noise<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SearchError> {
        let root_id = self.tree.root();
        let children: Vec<NodeId> = self
            .tree
            .get(root_id)
            .children
            .iter()
            .map(|(_, id)| *id)
            .collect();

        if children.is_empty() {
            return Ok(());
        }

        let noise = dirichlet_noise(children.len(), self.config.dirichlet_alpha, rng)?;
        let eps = self.config.dirichlet_epsilon;

        for (child_id, n) in children.into_iter().zip(noise) {
            let child = self.tree.get_mut(child_id);
            child.prior = (1.0 - eps) * child.prior + eps * n;
        }

        Ok(())
    }

    /// Get the search tree (for inspection/debugging).
    pub fn tree(&self) -> &MctsTree<S> {
        &self.tree
    }
}

/// Sample an action from a probability distribution.
pub fn sample_action<R: Rng + ?Sized>(policy: &[f32], rng: &mut R) -> Result<Action, SearchError> {
    let r: f32 = rng.gen();
    let mut cumsum = 0.0;

    for (i, &p) in policy.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return Ok(i as Action);
        }
    }

    // Fallback to last non-zero action (handles floating point issues)
    for (i, &p) in policy.iter().enumerate().rev() {
        if p > 0.0 {
            return Ok(i as Action);
        }
    }

    Err(SearchError::NoLegalMoves)
}

/// Generate Dirichlet-distributed noise using Gamma variates.
pub fn dirichlet_noise<R: Rng + ?Sized>(
    n: usize,
    alpha: f32,
    rng: &mut R,
) -> Result<Vec<f32>, SearchError> {
    use rand_distr::{Distribution, Gamma};

    let gamma = Gamma::new(alpha as f64, 1.0)
        .map_err(|e| SearchError::InvalidConfig(format!("dirichlet_alpha {}: {}", alpha, e)))?;
    let mut samples: Vec<f32> = (0..n).map(|_| gamma.sample(rng) as f32).collect();

    // Normalize
    let sum: f32 = samples.iter().sum();
    if sum > 0.0 {
        for s in &mut samples {
            *s /= sum;
        }
    } else if n > 0 {
        samples = vec![1.0 / n as f32; n];
    }

    Ok(samples)
}

/// Convenience function to run a single guided search.
pub fn run_mcts<S, E, R>(
    evaluator: &E,
    config: MctsConfig,
    state: S,
    rng: &mut R,
) -> Result<SearchResult, SearchError>
where
    S: GameState,
    E: Evaluator<S> + ?Sized,
    R: Rng + ?Sized,
{
    let mut search = MctsSearch::new(evaluator, config, state)?;
    search.run(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvalResult, UniformEvaluator};
    use games_tictactoe::{play_moves, State};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    /// Puts all policy mass on one fixed slot, legal or not.
    struct FixedSlotEvaluator(usize);

    impl Evaluator<State> for FixedSlotEvaluator {
        fn evaluate(&self, _state: &State) -> Result<EvalResult, EvaluatorError> {
            let mut policy = vec![0.0; 9];
            policy[self.0] = 1.0;
            Ok(EvalResult { policy, value: 0.0 })
        }
    }

    struct ShortPolicyEvaluator;

    impl Evaluator<State> for ShortPolicyEvaluator {
        fn evaluate(&self, _state: &State) -> Result<EvalResult, EvaluatorError> {
            Ok(EvalResult {
                policy: vec![1.0; 3],
                value: 0.0,
            })
        }
    }

    #[test]
    fn test_mcts_basic_search() {
        let evaluator = UniformEvaluator::new();
        let config = MctsConfig::for_testing().with_temperature(1.0);
        let mut rng = ChaCha20Rng::seed_from_u64(42);

        let result = run_mcts(&evaluator, config, State::new(), &mut rng).unwrap();

        // Should pick a valid action (0-8)
        assert!(result.action < 9);

        // Policy should sum to ~1.0
        let sum: f32 = result.policy.iter().sum();
        assert!((sum - 1.0).abs() < 0.01);

        // The root expansion counts toward the budget
        assert_eq!(result.stats.simulations, 25);
        assert_eq!(result.stats.evaluator_calls as usize + result.stats.terminal_hits as usize, 25);
    }

    #[test]
    fn test_root_visits_match_budget() {
        let evaluator = UniformEvaluator::new();
        let config = MctsConfig::default().with_temperature(0.0);

        let mut search = MctsSearch::new(&evaluator, config, State::new()).unwrap();
        search.run(&mut ChaCha20Rng::seed_from_u64(0)).unwrap();

        let tree = search.tree();
        let root = tree.get(tree.root());
        assert_eq!(root.visit_count, 50);
        let child_visits: u32 = tree.root_visits().iter().map(|(_, n)| n).sum();
        assert_eq!(child_visits, 49);
    }

    #[test]
    fn test_mcts_winning_move_has_positive_value() {
        // Board setup where X can win immediately:
        // X | X | _
        // O | O | _
        // _ | _ | _
        //
        // Position 2 is an instant win for X
        let state = play_moves(&[0, 3, 1, 4]).unwrap();
        let evaluator = UniformEvaluator::new();
        let config = MctsConfig::for_testing()
            .with_simulations(200)
            .with_temperature(0.0);

        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let mut search = MctsSearch::new(&evaluator, config, state).unwrap();
        let result = search.run(&mut rng).unwrap();

        let tree = search.tree();
        let root = tree.get(tree.root());
        let winning_child_id = root
            .children
            .iter()
            .find(|(action, _)| *action == 2)
            .map(|(_, id)| *id)
            .expect("Child for action 2 should exist");

        let winning_child = tree.get(winning_child_id);
        assert!(winning_child.is_terminal);
        // Stored from the loser's perspective
        assert!((winning_child.terminal_value - (-1.0)).abs() < 1e-6);

        assert_eq!(result.action, 2, "Should select winning move at position 2");
        assert!(
            result.value > 0.0,
            "Root value should be positive when winning move exists, got {}",
            result.value
        );
        assert!(result.policy[2] > 0.99);
        assert!(result.stats.terminal_hits > 0);
    }

    #[test]
    fn test_mcts_blocks_immediate_threat() {
        // X threatens 0-1-2; O to move must block at 2
        let state = play_moves(&[0, 4, 1]).unwrap();
        let config = MctsConfig::default()
            .with_simulations(400)
            .with_temperature(0.0);

        let result = run_mcts(
            &UniformEvaluator::new(),
            config,
            state,
            &mut ChaCha20Rng::seed_from_u64(7),
        )
        .unwrap();

        assert_eq!(result.action, 2);
    }

    #[test]
    fn test_degenerate_policy_falls_back_to_uniform() {
        // Slot 4 is occupied after X plays the centre
        let state = play_moves(&[4]).unwrap();
        let evaluator = FixedSlotEvaluator(4);
        let config = MctsConfig::for_testing().with_simulations(1);

        let mut search = MctsSearch::new(&evaluator, config, state).unwrap();
        let result = search.run(&mut ChaCha20Rng::seed_from_u64(1)).unwrap();

        assert_eq!(result.stats.degenerate_policies, 1);
        let tree = search.tree();
        let root = tree.get(tree.root());
        assert_eq!(root.children.len(), 8);
        for (_, id) in &root.children {
            assert!((tree.get(*id).prior - 1.0 / 8.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_priors_follow_evaluator() {
        let evaluator = FixedSlotEvaluator(8);
        let config = MctsConfig::for_testing().with_simulations(1);

        let mut search = MctsSearch::new(&evaluator, config, State::new()).unwrap();
        let result = search.run(&mut ChaCha20Rng::seed_from_u64(1)).unwrap();
        assert_eq!(result.stats.degenerate_policies, 0);

        let tree = search.tree();
        for (action, id) in &tree.get(tree.root()).children {
            let expected = if *action == 8 { 1.0 } else { 0.0 };
            assert!((tree.get(*id).prior - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_single_simulation_temperature_sampling_is_uniform_over_children() {
        let config = MctsConfig::for_testing()
            .with_simulations(1)
            .with_temperature(1.0);
        let result = run_mcts(
            &UniformEvaluator::new(),
            config,
            State::new(),
            &mut ChaCha20Rng::seed_from_u64(3),
        )
        .unwrap();

        for p in &result.policy {
            assert!((p - 1.0 / 9.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_bad_policy_length_is_error() {
        let result = run_mcts(
            &ShortPolicyEvaluator,
            MctsConfig::for_testing(),
            State::new(),
            &mut ChaCha20Rng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(SearchError::Evaluator(_))));
    }

    #[test]
    fn test_terminal_root_rejected() {
        let won = play_moves(&[0, 3, 1, 4, 2]).unwrap();
        let evaluator = UniformEvaluator::new();
        let result = MctsSearch::new(&evaluator, MctsConfig::default(), won);
        assert!(matches!(result, Err(SearchError::NoLegalMoves)));
    }

    #[test]
    fn test_dirichlet_noise_changes_priors() {
        let config = MctsConfig::for_testing()
            .with_simulations(1)
            .with_dirichlet(0.3, 0.25);
        let evaluator = UniformEvaluator::new();
        let mut search = MctsSearch::new(&evaluator, config, State::new()).unwrap();
        search.run(&mut ChaCha20Rng::seed_from_u64(11)).unwrap();

        let tree = search.tree();
        let priors: Vec<f32> = tree
            .get(tree.root())
            .children
            .iter()
            .map(|(_, id)| tree.get(*id).prior)
            .collect();
        let sum: f32 = priors.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(priors.iter().any(|p| (p - 1.0 / 9.0).abs() > 1e-4));
    }

    #[test]
    fn test_sample_action() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let policy = vec![0.0, 0.5, 0.3, 0.2, 0.0];

        // Sample many times and check distribution
        let mut counts = [0u32; 5];
        for _ in 0..1000 {
            let action = sample_action(&policy, &mut rng).unwrap();
            counts[action as usize] += 1;
        }

        // Action 0 and 4 should never be selected
        assert_eq!(counts[0], 0);
        assert_eq!(counts[4], 0);

        // Action 1 should be most common (~500), action 2 (~300), action 3 (~200)
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > counts[3]);
    }

    #[test]
    fn test_dirichlet_noise() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let noise = dirichlet_noise(5, 0.3, &mut rng).unwrap();

        // Should sum to 1.0
        let sum: f32 = noise.iter().sum();
        assert!((sum - 1.0).abs() < 0.01);

        // All values should be positive
        for &n in &noise {
            assert!(n >= 0.0);
        }
    }
}
