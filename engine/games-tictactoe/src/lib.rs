//! TicTacToe reference game for the Gambit search engines
//!
//! The state is stored as two 9-bit occupancy boards seen from the side to
//! move: `own` holds the mover's pieces, `opponent` the pieces of the player
//! who just moved. Every move places a piece for the mover and swaps the two
//! boards, so the search engines never need to track colours.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::GameState;
//! use games_tictactoe::State;
//!
//! let state = State::new();
//! let state = state.next(4).unwrap(); // first player takes the centre
//! assert!(!state.is_first_player());
//! assert_eq!(state.legal_actions().len(), 8);
//! ```

use std::fmt;

use engine_core::{Action, GameError, GameState};

/// Number of cells on the board (and size of the action space).
pub const NUM_CELLS: usize = 9;

/// Mask with all nine cell bits set.
const FULL_BOARD: u16 = 0x1FF;

/// Winning lines as cell bit masks.
const LINES: [u16; 8] = [
    0b000_000_111, // row 0: cells 0,1,2
    0b000_111_000, // row 1: cells 3,4,5
    0b111_000_000, // row 2: cells 6,7,8
    0b001_001_001, // column 0: cells 0,3,6
    0b010_010_010, // column 1: cells 1,4,7
    0b100_100_100, // column 2: cells 2,5,8
    0b100_010_001, // diagonal: cells 0,4,8
    0b001_010_100, // anti-diagonal: cells 2,4,6
];

/// TicTacToe game state
///
/// Immutable value type; `next` returns a new state with the boards swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct State {
    /// Pieces of the side to move
    own: u16,
    /// Pieces of the side that moved last
    opponent: u16,
}

impl State {
    /// Create the empty starting position (first player to move)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from mover-relative occupancy planes.
    ///
    /// Both planes must have nine 0/1 entries, must not overlap, and the
    /// previous mover must have placed the same number of pieces as the side
    /// to move or exactly one more.
    pub fn from_planes(own: &[u8], opponent: &[u8]) -> Result<Self, GameError> {
        let own = Self::plane_to_mask(own)?;
        let opponent = Self::plane_to_mask(opponent)?;

        if own & opponent != 0 {
            return Err(GameError::InvalidState(format!(
                "planes overlap at mask {:#011b}",
                own & opponent
            )));
        }

        let diff = opponent.count_ones() as i32 - own.count_ones() as i32;
        if !(0..=1).contains(&diff) {
            return Err(GameError::InvalidState(format!(
                "piece counts own={} opponent={} are unreachable",
                own.count_ones(),
                opponent.count_ones()
            )));
        }

        Ok(Self { own, opponent })
    }

    fn plane_to_mask(plane: &[u8]) -> Result<u16, GameError> {
        if plane.len() != NUM_CELLS {
            return Err(GameError::InvalidState(format!(
                "expected {} cells, got {}",
                NUM_CELLS,
                plane.len()
            )));
        }

        plane
            .iter()
            .enumerate()
            .try_fold(0u16, |mask, (idx, &cell)| match cell {
                0 => Ok(mask),
                1 => Ok(mask | (1u16 << idx)),
                other => Err(GameError::InvalidState(format!(
                    "invalid cell value {} at {}",
                    other, idx
                ))),
            })
    }

    /// Bit board of the side to move
    pub fn own_mask(&self) -> u16 {
        self.own
    }

    /// Bit board of the side that moved last
    pub fn opponent_mask(&self) -> u16 {
        self.opponent
    }

    /// Number of pieces the side to move has placed
    pub fn own_count(&self) -> u32 {
        self.own.count_ones()
    }

    /// Number of pieces the previous mover has placed
    pub fn opponent_count(&self) -> u32 {
        self.opponent.count_ones()
    }

    /// Bit-mask representation of empty cells.
    ///
    /// Bits 0-8 correspond to board positions 0-8.
    pub fn legal_moves_mask(&self) -> u16 {
        !(self.own | self.opponent) & FULL_BOARD
    }

    fn has_line(mask: u16) -> bool {
        LINES.iter().any(|&line| mask & line == line)
    }

    fn plane(mask: u16) -> Vec<u8> {
        (0..NUM_CELLS).map(|i| ((mask >> i) & 1) as u8).collect()
    }
}

impl GameState for State {
    const NUM_ACTIONS: usize = NUM_CELLS;

    fn legal_actions(&self) -> Vec<Action> {
        let empty = self.legal_moves_mask();
        (0..NUM_CELLS as u8)
            .filter(|&pos| empty & (1u16 << pos) != 0)
            .collect()
    }

    fn next(&self, action: Action) -> Result<Self, GameError> {
        if action as usize >= NUM_CELLS {
            return Err(GameError::InvalidAction {
                action,
                reason: format!("cell must be below {}", NUM_CELLS),
            });
        }

        let bit = 1u16 << action;
        if (self.own | self.opponent) & bit != 0 {
            return Err(GameError::InvalidAction {
                action,
                reason: "cell is occupied".to_string(),
            });
        }

        Ok(Self {
            own: self.opponent,
            opponent: self.own | bit,
        })
    }

    fn is_loss(&self) -> bool {
        Self::has_line(self.opponent)
    }

    fn is_draw(&self) -> bool {
        (self.own | self.opponent) == FULL_BOARD && !self.is_loss()
    }

    fn is_first_player(&self) -> bool {
        self.own.count_ones() == self.opponent.count_ones()
    }

    fn planes(&self) -> (Vec<u8>, Vec<u8>) {
        (Self::plane(self.own), Self::plane(self.opponent))
    }
}

impl fmt::Display for State {
    /// Renders the board with `o` for the first player and `x` for the second.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (own_mark, opponent_mark) = if self.is_first_player() {
            ('o', 'x')
        } else {
            ('x', 'o')
        };

        for row in 0..3 {
            for col in 0..3 {
                let bit = 1u16 << (row * 3 + col);
                let mark = if self.own & bit != 0 {
                    own_mark
                } else if self.opponent & bit != 0 {
                    opponent_mark
                } else {
                    '-'
                };
                write!(f, "{}", mark)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Play a sequence of moves from the empty board.
pub fn play_moves(moves: &[Action]) -> Result<State, GameError> {
    moves
        .iter()
        .try_fold(State::new(), |state, &action| state.next(action))
}
