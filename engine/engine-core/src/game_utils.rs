//! Shared scoring utilities for two-player zero-sum games
//!
//! All helpers read a finished (or in-progress) `GameState` and translate
//! its mover-relative outcome into the perspective a caller needs.

use rand::Rng;

use crate::typed::{Action, GameState};

/// Value of a terminal state for the side to move.
///
/// * `-1.0` if the previous mover completed a win
/// * `0.0` for draws (and for non-terminal states)
#[inline]
pub fn terminal_value<S: GameState>(state: &S) -> f32 {
    if state.is_loss() {
        -1.0
    } else {
        0.0
    }
}

/// Points scored by the first player in a finished game.
///
/// Returns 1.0 for a first-player win, 0.0 for a second-player win and 0.5
/// for a draw.
#[inline]
pub fn first_player_point<S: GameState>(ended: &S) -> f64 {
    if ended.is_loss() {
        if ended.is_first_player() {
            0.0
        } else {
            1.0
        }
    } else {
        0.5
    }
}

/// Outcome of a finished game from the first player's perspective.
#[inline]
pub fn first_player_value<S: GameState>(ended: &S) -> f32 {
    if ended.is_loss() {
        if ended.is_first_player() {
            -1.0
        } else {
            1.0
        }
    } else {
        0.0
    }
}

/// Pick a uniformly random legal action, or `None` once the game is over.
pub fn random_action<S: GameState, R: Rng + ?Sized>(state: &S, rng: &mut R) -> Option<Action> {
    if state.is_terminal() {
        return None;
    }
    let legal = state.legal_actions();
    if legal.is_empty() {
        return None;
    }
    Some(legal[rng.gen_range(0..legal.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Pile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_terminal_value() {
        assert_eq!(terminal_value(&Pile { stones: 0, ply: 3 }), -1.0);
        assert_eq!(terminal_value(&Pile { stones: 4, ply: 0 }), 0.0);
    }

    #[test]
    fn test_first_player_point() {
        // Second player to move with no stones left: first player took the last one
        let first_won = Pile { stones: 0, ply: 1 };
        assert!(!first_won.is_first_player());
        assert_eq!(first_player_point(&first_won), 1.0);
        assert_eq!(first_player_value(&first_won), 1.0);

        let second_won = Pile { stones: 0, ply: 2 };
        assert_eq!(first_player_point(&second_won), 0.0);
        assert_eq!(first_player_value(&second_won), -1.0);
    }

    #[test]
    fn test_random_action_is_legal() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let state = Pile { stones: 5, ply: 0 };
        for _ in 0..50 {
            let action = random_action(&state, &mut rng).unwrap();
            assert!(state.legal_actions().contains(&action));
        }

        assert_eq!(random_action(&Pile { stones: 0, ply: 0 }, &mut rng), None);
    }
}
