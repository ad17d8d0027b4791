//! Centralized configuration loading from config.toml.
//!
//! This crate provides configuration structs and loading logic shared
//! across the Gambit binaries.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`GAMBIT_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (`config.defaults.toml`, embedded at compile time)
//!
//! Command-line flags of the binaries sit above all three.
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! GAMBIT_<SECTION>_<KEY>=value
//!
//! Examples:
//!     GAMBIT_COMMON_DATA_DIR=/data
//!     GAMBIT_MCTS_NUM_SIMULATIONS=200
//!     GAMBIT_SELF_PLAY_GAMES=50
//!     GAMBIT_TRAINING_CYCLES=3
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{
    apply_env_overrides, load_config, load_from_path, CONFIG_PATH_ENV, CONFIG_SEARCH_PATHS,
};
pub use structs::*;
