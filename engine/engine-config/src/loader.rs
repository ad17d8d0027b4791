//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "GAMBIT_CONFIG";

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",    // Current directory
    "../config.toml", // Parent directory (when running from a crate directory)
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by the GAMBIT_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    // Check for explicit config path
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from {}: {}", CONFIG_PATH_ENV, path.display());
            return load_from_path(&path);
        }
        warn!(
            "{}={} not found, searching defaults",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    // Search default locations
    for path_str in CONFIG_SEARCH_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(path);
        }
    }

    // Fall back to defaults
    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
///
/// An unreadable or malformed file is logged and replaced by the defaults.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u32, u64, f64, bool, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        match std::env::var($key).map(|s| s.parse()) {
            Ok(Ok(v)) => $config.$section.$field = v,
            Ok(Err(_)) => warn!("Ignoring unparseable {}", $key),
            Err(_) => {}
        }
    };
    // Optional parseable field (Option<u32>, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, optional_parse) => {
        match std::env::var($key).map(|s| s.parse()) {
            Ok(Ok(v)) => $config.$section.$field = Some(v),
            Ok(Err(_)) => warn!("Ignoring unparseable {}", $key),
            Err(_) => {}
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: GAMBIT_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.data_dir, "GAMBIT_COMMON_DATA_DIR");
    env_override!(config, common.log_level, "GAMBIT_COMMON_LOG_LEVEL");
    env_override!(config, common.seed, "GAMBIT_COMMON_SEED", parse);

    // MCTS
    env_override!(
        config,
        mcts.num_simulations,
        "GAMBIT_MCTS_NUM_SIMULATIONS",
        parse
    );
    env_override!(config, mcts.c_puct, "GAMBIT_MCTS_C_PUCT", parse);
    env_override!(
        config,
        mcts.dirichlet_alpha,
        "GAMBIT_MCTS_DIRICHLET_ALPHA",
        parse
    );
    env_override!(
        config,
        mcts.dirichlet_epsilon,
        "GAMBIT_MCTS_DIRICHLET_EPSILON",
        parse
    );

    // Rollout
    env_override!(
        config,
        rollout.num_simulations,
        "GAMBIT_ROLLOUT_NUM_SIMULATIONS",
        parse
    );
    env_override!(
        config,
        rollout.expansion_threshold,
        "GAMBIT_ROLLOUT_EXPANSION_THRESHOLD",
        parse
    );
    env_override!(
        config,
        rollout.exploration,
        "GAMBIT_ROLLOUT_EXPLORATION",
        parse
    );

    // Exact
    env_override!(
        config,
        exact.transposition_table,
        "GAMBIT_EXACT_TRANSPOSITION_TABLE",
        parse
    );
    env_override!(
        config,
        exact.max_depth,
        "GAMBIT_EXACT_MAX_DEPTH",
        optional_parse
    );

    // Self-play
    env_override!(config, self_play.games, "GAMBIT_SELF_PLAY_GAMES", parse);
    env_override!(
        config,
        self_play.temperature,
        "GAMBIT_SELF_PLAY_TEMPERATURE",
        parse
    );
    env_override!(
        config,
        self_play.workers,
        "GAMBIT_SELF_PLAY_WORKERS",
        parse
    );

    // Evaluation
    env_override!(
        config,
        evaluation.games,
        "GAMBIT_EVALUATION_GAMES",
        parse
    );
    env_override!(
        config,
        evaluation.temperature,
        "GAMBIT_EVALUATION_TEMPERATURE",
        parse
    );
    env_override!(
        config,
        evaluation.benchmark_games,
        "GAMBIT_EVALUATION_BENCHMARK_GAMES",
        parse
    );
    env_override!(
        config,
        evaluation.benchmark_baselines,
        "GAMBIT_EVALUATION_BENCHMARK_BASELINES",
        parse
    );

    // Training
    env_override!(config, training.cycles, "GAMBIT_TRAINING_CYCLES", parse);
    env_override!(
        config,
        training.learning_rate,
        "GAMBIT_TRAINING_LEARNING_RATE",
        parse
    );

    config
}
