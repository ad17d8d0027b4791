//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time, so a binary runs with no
//! config file present and documentation and code never disagree.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    mcts: MctsDefaults,
    rollout: RolloutDefaults,
    exact: ExactDefaults,
    self_play: SelfPlayDefaults,
    evaluation: EvaluationDefaults,
    training: TrainingDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    log_level: String,
    seed: u64,
}

#[derive(Debug, Deserialize)]
struct MctsDefaults {
    num_simulations: u32,
    c_puct: f64,
    dirichlet_alpha: f64,
    dirichlet_epsilon: f64,
}

#[derive(Debug, Deserialize)]
struct RolloutDefaults {
    num_simulations: u32,
    expansion_threshold: u32,
    exploration: f64,
}

#[derive(Debug, Deserialize)]
struct ExactDefaults {
    transposition_table: bool,
    #[serde(default)]
    max_depth: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SelfPlayDefaults {
    games: u32,
    temperature: f64,
    workers: usize,
}

#[derive(Debug, Deserialize)]
struct EvaluationDefaults {
    games: u32,
    temperature: f64,
    benchmark_games: u32,
    benchmark_baselines: bool,
}

#[derive(Debug, Deserialize)]
struct TrainingDefaults {
    cycles: u32,
    learning_rate: f64,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}
pub fn seed() -> u64 {
    DEFAULTS.common.seed
}

// MCTS
pub fn num_simulations() -> u32 {
    DEFAULTS.mcts.num_simulations
}
pub fn c_puct() -> f64 {
    DEFAULTS.mcts.c_puct
}
pub fn dirichlet_alpha() -> f64 {
    DEFAULTS.mcts.dirichlet_alpha
}
pub fn dirichlet_epsilon() -> f64 {
    DEFAULTS.mcts.dirichlet_epsilon
}

// Rollout
pub fn rollout_simulations() -> u32 {
    DEFAULTS.rollout.num_simulations
}
pub fn expansion_threshold() -> u32 {
    DEFAULTS.rollout.expansion_threshold
}
pub fn exploration() -> f64 {
    DEFAULTS.rollout.exploration
}

// Exact
pub fn transposition_table() -> bool {
    DEFAULTS.exact.transposition_table
}
pub fn max_depth() -> Option<u32> {
    DEFAULTS.exact.max_depth
}

// Self-play
pub fn self_play_games() -> u32 {
    DEFAULTS.self_play.games
}
pub fn self_play_temperature() -> f64 {
    DEFAULTS.self_play.temperature
}
pub fn workers() -> usize {
    DEFAULTS.self_play.workers
}

// Evaluation
pub fn eval_games() -> u32 {
    DEFAULTS.evaluation.games
}
pub fn eval_temperature() -> f64 {
    DEFAULTS.evaluation.temperature
}
pub fn benchmark_games() -> u32 {
    DEFAULTS.evaluation.benchmark_games
}
pub fn benchmark_baselines() -> bool {
    DEFAULTS.evaluation.benchmark_baselines
}

// Training
pub fn cycles() -> u32 {
    DEFAULTS.training.cycles
}
pub fn learning_rate() -> f64 {
    DEFAULTS.training.learning_rate
}
