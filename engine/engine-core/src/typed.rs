//! Typed game-state contract used by every search engine.
//!
//! A `GameState` is an immutable, mover-relative snapshot: the side to move
//! always sees its own pieces as "own" and the previous mover's pieces as
//! "opponent". Applying an action returns a fresh state with the roles
//! swapped, so search code never needs to know which colour is on move.

use thiserror::Error;

/// Index of a global action slot (board cell for placement games).
pub type Action = u8;

/// Errors raised by game rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Invalid action {action}: {reason}")]
    InvalidAction { action: Action, reason: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Rules oracle for a finite two-player zero-sum game.
///
/// Implementations must be cheap to clone; search trees store one state per
/// node by value.
pub trait GameState: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Size of the global action space. Policy vectors always have this length.
    const NUM_ACTIONS: usize;

    /// Legal actions in ascending slot order.
    ///
    /// The order is significant: exact search and MCTS break ties by taking
    /// the first action in this order.
    fn legal_actions(&self) -> Vec<Action>;

    /// Apply `action` for the side to move and return the successor state.
    fn next(&self, action: Action) -> Result<Self, GameError>;

    /// True iff the previous mover (the side in `opponent`) has won.
    fn is_loss(&self) -> bool;

    /// True iff the game ended without a winner.
    fn is_draw(&self) -> bool;

    fn is_terminal(&self) -> bool {
        self.is_loss() || self.is_draw()
    }

    /// True iff the side to move is the player who moved first in the game.
    fn is_first_player(&self) -> bool;

    /// Mover-relative occupancy planes: own pieces, then opponent pieces.
    fn planes(&self) -> (Vec<u8>, Vec<u8>);

    /// Legality per action slot, `NUM_ACTIONS` long.
    fn legal_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; Self::NUM_ACTIONS];
        for action in self.legal_actions() {
            if let Some(slot) = mask.get_mut(action as usize) {
                *slot = true;
            }
        }
        mask
    }
}
