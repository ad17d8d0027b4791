//! Core traits and types shared by every Gambit crate.
//!
//! This crate provides the fundamental abstractions for game search:
//! - `GameState`: immutable, mover-relative game state and rules oracle
//! - `Example` / `History`: the training dataset produced by self-play
//! - `game_utils`: scoring helpers for finished two-player games

pub mod dataset;
pub mod game_utils;
pub mod typed;

// Re-export main types for convenience
pub use dataset::{position_key, Example, History};
pub use game_utils::{first_player_point, first_player_value, random_action, terminal_value};
pub use typed::{Action, GameError, GameState};
