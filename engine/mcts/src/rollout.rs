//! Rollout-based (UCB1) tree search.
//!
//! Leaves are valued by uniformly random playouts instead of an evaluator.
//! A leaf only grows children after it has been visited
//! `expansion_threshold` times, so the tree stays shallow where playouts
//! are cheap.

use engine_core::{terminal_value, Action, GameState};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::config::RolloutConfig;
use crate::node::NodeId;
use crate::search::SearchError;
use crate::tree::MctsTree;

/// Result of a rollout search.
#[derive(Debug, Clone)]
pub struct RolloutResult {
    /// Most visited root action (first on ties)
    pub action: Action,

    /// Root children visit counts in action order
    pub visits: Vec<(Action, u32)>,

    /// Mean value at the root for its side to move
    pub value: f32,

    pub simulations: u32,
    pub tree_size: usize,
}

/// Rollout search state for a single call.
pub struct RolloutSearch<S: GameState> {
    tree: MctsTree<S>,
    config: RolloutConfig,
}

impl<S: GameState> RolloutSearch<S> {
    pub fn new(config: RolloutConfig, state: S) -> Result<Self, SearchError> {
        config.validate()?;

        if state.is_terminal() || state.legal_actions().is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        Ok(Self {
            tree: MctsTree::new(state),
            config,
        })
    }

    /// Run the configured number of simulations and pick the root action.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RolloutResult, SearchError> {
        let root_id = self.tree.root();
        self.expand(root_id)?;

        for _ in 0..self.config.num_simulations {
            self.simulate(rng)?;
        }

        let (action, _) = self.tree.best_action().ok_or(SearchError::NoLegalMoves)?;
        let root = self.tree.get(root_id);

        trace!(
            action,
            value = root.mean_value(),
            simulations = self.config.num_simulations,
            tree_size = self.tree.len(),
            "Rollout search complete"
        );

        Ok(RolloutResult {
            action,
            visits: self.tree.root_visits(),
            value: root.mean_value(),
            simulations: self.config.num_simulations,
            tree_size: self.tree.len(),
        })
    }

    fn simulate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SearchError> {
        let mut current = self.tree.root();
        loop {
            let node = self.tree.get(current);
            if node.is_leaf() {
                break;
            }
            match self
                .tree
                .select_child_ucb1(current, self.config.exploration)
            {
                Some(child_id) => current = child_id,
                None => break,
            }
        }

        let leaf = self.tree.get(current);
        let value = if leaf.is_terminal {
            leaf.terminal_value
        } else {
            playout(&leaf.state, rng)?
        };

        self.tree.backpropagate(current, value);

        let leaf = self.tree.get(current);
        if !leaf.is_terminal
            && !leaf.is_expanded()
            && leaf.visit_count >= self.config.expansion_threshold
        {
            self.expand(current)?;
        }

        Ok(())
    }

    fn expand(&mut self, node_id: NodeId) -> Result<(), SearchError> {
        let state = self.tree.get(node_id).state.clone();
        let legal = state.legal_actions();
        if legal.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let prior = 1.0 / legal.len() as f32;
        for action in legal {
            let child = state.next(action)?;
            self.tree.add_child(node_id, action, prior, child);
        }
        Ok(())
    }

    pub fn tree(&self) -> &MctsTree<S> {
        &self.tree
    }
}

/// Play uniformly random moves from `state` until the game ends.
///
/// Returns the outcome for the side to move at `state`: the final mover's
/// value (-1 loss, 0 draw) negated once per ply played.
pub fn playout<S: GameState, R: Rng + ?Sized>(state: &S, rng: &mut R) -> Result<f32, SearchError> {
    let mut current = state.clone();
    let mut plies = 0usize;

    while !current.is_terminal() {
        let action = *current
            .legal_actions()
            .choose(rng)
            .ok_or(SearchError::NoLegalMoves)?;
        current = current.next(action)?;
        plies += 1;
    }

    let value = terminal_value(&current);
    Ok(if plies % 2 == 0 { value } else { -value })
}

/// Convenience function to run a single rollout search.
pub fn run_rollout_mcts<S: GameState, R: Rng + ?Sized>(
    config: RolloutConfig,
    state: S,
    rng: &mut R,
) -> Result<RolloutResult, SearchError> {
    RolloutSearch::new(config, state)?.run(rng)
}
