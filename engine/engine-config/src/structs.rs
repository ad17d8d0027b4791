//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// These call the accessor functions from defaults module
// ============================================================================

fn d_data_dir() -> String {
    defaults::data_dir().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_seed() -> u64 {
    defaults::seed()
}
fn d_num_sims() -> u32 {
    defaults::num_simulations()
}
fn d_c_puct() -> f64 {
    defaults::c_puct()
}
fn d_dirichlet_alpha() -> f64 {
    defaults::dirichlet_alpha()
}
fn d_dirichlet_epsilon() -> f64 {
    defaults::dirichlet_epsilon()
}
fn d_rollout_sims() -> u32 {
    defaults::rollout_simulations()
}
fn d_expansion_threshold() -> u32 {
    defaults::expansion_threshold()
}
fn d_exploration() -> f64 {
    defaults::exploration()
}
fn d_transposition_table() -> bool {
    defaults::transposition_table()
}
fn d_max_depth() -> Option<u32> {
    defaults::max_depth()
}
fn d_self_play_games() -> u32 {
    defaults::self_play_games()
}
fn d_self_play_temperature() -> f64 {
    defaults::self_play_temperature()
}
fn d_workers() -> usize {
    defaults::workers()
}
fn d_eval_games() -> u32 {
    defaults::eval_games()
}
fn d_eval_temperature() -> f64 {
    defaults::eval_temperature()
}
fn d_benchmark_games() -> u32 {
    defaults::benchmark_games()
}
fn d_benchmark_baselines() -> bool {
    defaults::benchmark_baselines()
}
fn d_cycles() -> u32 {
    defaults::cycles()
}
fn d_learning_rate() -> f64 {
    defaults::learning_rate()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub mcts: MctsConfig,
    #[serde(default)]
    pub rollout: RolloutConfig,
    #[serde(default)]
    pub exact: ExactConfig,
    #[serde(default)]
    pub self_play: SelfPlayConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
    /// Base seed; every engine and worker derives its RNG from it
    #[serde(default = "d_seed")]
    pub seed: u64,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            log_level: defaults::log_level().into(),
            seed: defaults::seed(),
        }
    }
}

/// Guided (PUCT) search configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MctsConfig {
    #[serde(default = "d_num_sims")]
    pub num_simulations: u32,
    #[serde(default = "d_c_puct")]
    pub c_puct: f64,
    /// 0 disables root noise
    #[serde(default = "d_dirichlet_alpha")]
    pub dirichlet_alpha: f64,
    #[serde(default = "d_dirichlet_epsilon")]
    pub dirichlet_epsilon: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: defaults::num_simulations(),
            c_puct: defaults::c_puct(),
            dirichlet_alpha: defaults::dirichlet_alpha(),
            dirichlet_epsilon: defaults::dirichlet_epsilon(),
        }
    }
}

/// Rollout (UCB1) search configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RolloutConfig {
    #[serde(default = "d_rollout_sims")]
    pub num_simulations: u32,
    #[serde(default = "d_expansion_threshold")]
    pub expansion_threshold: u32,
    #[serde(default = "d_exploration")]
    pub exploration: f64,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            num_simulations: defaults::rollout_simulations(),
            expansion_threshold: defaults::expansion_threshold(),
            exploration: defaults::exploration(),
        }
    }
}

/// Exact search configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExactConfig {
    #[serde(default = "d_transposition_table")]
    pub transposition_table: bool,
    /// None = search to the end of the game
    #[serde(default = "d_max_depth")]
    pub max_depth: Option<u32>,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            transposition_table: defaults::transposition_table(),
            max_depth: defaults::max_depth(),
        }
    }
}

/// Self-play data generation
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SelfPlayConfig {
    /// Games per batch
    #[serde(default = "d_self_play_games")]
    pub games: u32,
    #[serde(default = "d_self_play_temperature")]
    pub temperature: f64,
    /// Parallel game workers
    #[serde(default = "d_workers")]
    pub workers: usize,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            games: defaults::self_play_games(),
            temperature: defaults::self_play_temperature(),
            workers: defaults::workers(),
        }
    }
}

/// Arena and benchmark configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Candidate-vs-incumbent arena games
    #[serde(default = "d_eval_games")]
    pub games: u32,
    #[serde(default = "d_eval_temperature")]
    pub temperature: f64,
    /// Games per baseline when benchmarking a promoted incumbent
    #[serde(default = "d_benchmark_games")]
    pub benchmark_games: u32,
    #[serde(default = "d_benchmark_baselines")]
    pub benchmark_baselines: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            games: defaults::eval_games(),
            temperature: defaults::eval_temperature(),
            benchmark_games: defaults::benchmark_games(),
            benchmark_baselines: defaults::benchmark_baselines(),
        }
    }
}

/// Training loop configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    #[serde(default = "d_cycles")]
    pub cycles: u32,
    /// Step size of the tabular evaluator update
    #[serde(default = "d_learning_rate")]
    pub learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            cycles: defaults::cycles(),
            learning_rate: defaults::learning_rate(),
        }
    }
}
