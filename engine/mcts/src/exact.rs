//! Exact backward-induction search.
//!
//! Values are from the side to move: -1 loss, 0 draw, +1 win. The free
//! functions search the full game tree; [`Minimax`] adds an optional
//! transposition table and depth horizon on top of the same recursion.

use std::collections::HashMap;

use engine_core::{position_key, Action, GameState};
use tracing::trace;

use crate::config::ExactConfig;
use crate::search::SearchError;

/// Bound strictly outside the value range, used as the open window.
pub const SCORE_BOUND: i32 = 2;

fn terminal_score<S: GameState>(state: &S) -> Option<i32> {
    if state.is_loss() {
        Some(-1)
    } else if state.is_draw() {
        Some(0)
    } else {
        None
    }
}

fn root_actions<S: GameState>(state: &S) -> Result<Vec<Action>, SearchError> {
    if state.is_terminal() {
        return Err(SearchError::NoLegalMoves);
    }
    let legal = state.legal_actions();
    if legal.is_empty() {
        return Err(SearchError::NoLegalMoves);
    }
    Ok(legal)
}

/// Game-theoretic value of `state` for its side to move.
pub fn minimax_value<S: GameState>(state: &S) -> Result<i32, SearchError> {
    if let Some(score) = terminal_score(state) {
        return Ok(score);
    }

    let legal = state.legal_actions();
    if legal.is_empty() {
        return Err(SearchError::NoLegalMoves);
    }

    let mut best = -SCORE_BOUND;
    for action in legal {
        best = best.max(-minimax_value(&state.next(action)?)?);
    }
    Ok(best)
}

/// Fail-hard alpha-beta in negamax form.
///
/// Exact whenever the true value lies inside `(alpha, beta)`.
pub fn alpha_beta<S: GameState>(state: &S, mut alpha: i32, beta: i32) -> Result<i32, SearchError> {
    if let Some(score) = terminal_score(state) {
        return Ok(score);
    }

    let legal = state.legal_actions();
    if legal.is_empty() {
        return Err(SearchError::NoLegalMoves);
    }

    for action in legal {
        let score = -alpha_beta(&state.next(action)?, -beta, -alpha)?;
        alpha = alpha.max(score);
        if score >= beta {
            return Ok(score);
        }
    }
    Ok(alpha)
}

/// Alpha-beta over the open window; equals [`minimax_value`].
pub fn alpha_beta_value<S: GameState>(state: &S) -> Result<i32, SearchError> {
    alpha_beta(state, -SCORE_BOUND, SCORE_BOUND)
}

/// First legal action achieving the minimax value.
pub fn minimax_action<S: GameState>(state: &S) -> Result<Action, SearchError> {
    let mut best: Option<(Action, i32)> = None;
    for action in root_actions(state)? {
        let score = -minimax_value(&state.next(action)?)?;
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((action, score));
        }
    }
    best.map(|(a, _)| a).ok_or(SearchError::NoLegalMoves)
}

/// First legal action achieving the alpha-beta value.
///
/// Later actions are searched with the window narrowed to the best score so
/// far; they can only replace it by strictly improving on it.
pub fn alpha_beta_action<S: GameState>(state: &S) -> Result<Action, SearchError> {
    let mut alpha = -SCORE_BOUND;
    let mut best: Option<Action> = None;
    for action in root_actions(state)? {
        let score = -alpha_beta(&state.next(action)?, -SCORE_BOUND, -alpha)?;
        if best.is_none() || score > alpha {
            alpha = score;
            best = Some(action);
        }
    }
    best.ok_or(SearchError::NoLegalMoves)
}

/// Minimax searcher with optional memoisation and depth horizon.
///
/// With the transposition table enabled, values are cached by position and
/// remaining depth, so results match the uncached search exactly.
#[derive(Debug, Default)]
pub struct Minimax {
    config: ExactConfig,
    table: HashMap<(String, u32), i32>,
    nodes: u64,
}

impl Minimax {
    pub fn new(config: ExactConfig) -> Self {
        Self {
            config,
            table: HashMap::new(),
            nodes: 0,
        }
    }

    pub fn config(&self) -> &ExactConfig {
        &self.config
    }

    /// Nodes visited since construction or the last [`clear`](Self::clear).
    pub fn nodes_searched(&self) -> u64 {
        self.nodes
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    pub fn clear(&mut self) {
        self.table.clear();
        self.nodes = 0;
    }

    /// Value of `state` for its side to move.
    pub fn value<S: GameState>(&mut self, state: &S) -> Result<i32, SearchError> {
        self.search(state, 0)
    }

    /// First legal action achieving the best value.
    pub fn best_action<S: GameState>(&mut self, state: &S) -> Result<Action, SearchError> {
        let mut best: Option<(Action, i32)> = None;
        for action in root_actions(state)? {
            let score = -self.search(&state.next(action)?, 1)?;
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((action, score));
            }
        }

        let (action, score) = best.ok_or(SearchError::NoLegalMoves)?;
        trace!(
            action,
            score,
            nodes = self.nodes,
            table = self.table.len(),
            "Exact search complete"
        );
        Ok(action)
    }

    fn search<S: GameState>(&mut self, state: &S, depth: u32) -> Result<i32, SearchError> {
        self.nodes += 1;

        if let Some(score) = terminal_score(state) {
            return Ok(score);
        }

        let remaining = match self.config.max_depth {
            Some(max) if depth >= max => return Ok(0),
            Some(max) => max - depth,
            None => u32::MAX,
        };

        let key = if self.config.transposition_table {
            let (own, opponent) = state.planes();
            let key = (position_key(&own, &opponent), remaining);
            if let Some(&cached) = self.table.get(&key) {
                return Ok(cached);
            }
            Some(key)
        } else {
            None
        };

        let legal = state.legal_actions();
        if legal.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let mut best = -SCORE_BOUND;
        for action in legal {
            best = best.max(-self.search(&state.next(action)?, depth + 1)?);
        }

        if let Some(key) = key {
            self.table.insert(key, best);
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_tictactoe::{play_moves, State};
    use std::collections::HashSet;

    fn reachable_states() -> Vec<State> {
        let mut seen = HashSet::new();
        let mut stack = vec![State::new()];
        let mut states = Vec::new();

        while let Some(state) = stack.pop() {
            if !seen.insert(state) {
                continue;
            }
            states.push(state);
            if !state.is_terminal() {
                for action in state.legal_actions() {
                    stack.push(state.next(action).unwrap());
                }
            }
        }
        states
    }

    #[test]
    fn test_terminal_values() {
        let lost = play_moves(&[0, 3, 1, 4, 2]).unwrap();
        assert_eq!(minimax_value(&lost).unwrap(), -1);
        assert_eq!(alpha_beta_value(&lost).unwrap(), -1);

        let drawn = play_moves(&[0, 1, 2, 4, 3, 5, 7, 6, 8]).unwrap();
        assert_eq!(minimax_value(&drawn).unwrap(), 0);
    }

    #[test]
    fn test_start_position_is_a_draw() {
        let start = State::new();
        assert_eq!(minimax_value(&start).unwrap(), 0);

        let action = minimax_action(&start).unwrap();
        assert_eq!(-minimax_value(&start.next(action).unwrap()).unwrap(), 0);

        let action = alpha_beta_action(&start).unwrap();
        assert_eq!(-alpha_beta_value(&start.next(action).unwrap()).unwrap(), 0);

        // Every opening draws, so the first legal action wins the tie
        assert_eq!(minimax_action(&start).unwrap(), 0);
        assert_eq!(alpha_beta_action(&start).unwrap(), 0);
    }

    #[test]
    fn test_alpha_beta_matches_minimax_everywhere() {
        let mut searcher = Minimax::new(ExactConfig::default().with_transposition_table());
        for state in reachable_states() {
            let expected = minimax_value(&state).unwrap();
            assert_eq!(alpha_beta_value(&state).unwrap(), expected, "{}", state);
            assert_eq!(searcher.value(&state).unwrap(), expected, "{}", state);
        }
    }

    #[test]
    fn test_root_actions_agree() {
        for state in reachable_states().into_iter().filter(|s| !s.is_terminal()) {
            let a = minimax_action(&state).unwrap();
            let b = alpha_beta_action(&state).unwrap();
            assert_eq!(a, b, "{}", state);
        }
    }

    #[test]
    fn test_takes_win_and_blocks() {
        // X to move can win at 2
        let state = play_moves(&[0, 3, 1, 4]).unwrap();
        assert_eq!(minimax_value(&state).unwrap(), 1);
        assert_eq!(alpha_beta_action(&state).unwrap(), 2);

        // O to move must block at 2
        let state = play_moves(&[0, 4, 1]).unwrap();
        assert_eq!(minimax_action(&state).unwrap(), 2);
    }

    #[test]
    fn test_transposition_table_saves_work() {
        let mut plain = Minimax::new(ExactConfig::default());
        let mut cached = Minimax::new(ExactConfig::default().with_transposition_table());

        assert_eq!(plain.value(&State::new()).unwrap(), 0);
        assert_eq!(cached.value(&State::new()).unwrap(), 0);

        assert!(cached.nodes_searched() < plain.nodes_searched());
        assert!(cached.table_len() > 0);
        assert_eq!(plain.table_len(), 0);

        cached.clear();
        assert_eq!(cached.table_len(), 0);
        assert_eq!(cached.nodes_searched(), 0);
    }

    #[test]
    fn test_depth_limit() {
        // Horizon at the root: undecided positions score 0
        let mut searcher = Minimax::new(ExactConfig::default().with_max_depth(0));
        let state = play_moves(&[0, 3, 1, 4]).unwrap();
        assert_eq!(searcher.value(&state).unwrap(), 0);

        // One ply of lookahead still sees the immediate win
        let mut searcher = Minimax::new(ExactConfig::default().with_max_depth(1));
        assert_eq!(searcher.value(&state).unwrap(), 1);
        assert_eq!(searcher.best_action(&state).unwrap(), 2);
    }

    #[test]
    fn test_terminal_root_has_no_action() {
        let lost = play_moves(&[0, 3, 1, 4, 2]).unwrap();
        assert!(matches!(minimax_action(&lost), Err(SearchError::NoLegalMoves)));
        assert!(matches!(alpha_beta_action(&lost), Err(SearchError::NoLegalMoves)));
        assert!(matches!(
            Minimax::default().best_action(&lost),
            Err(SearchError::NoLegalMoves)
        ));
    }
}
