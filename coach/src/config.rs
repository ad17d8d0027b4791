//! Command-line configuration for the coach binary.
//!
//! Defaults come from the central config (config.toml plus `GAMBIT_*`
//! environment overrides). CLI arguments take highest priority.

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use engine_config::{load_config, CentralConfig};
use mcts::{ExactConfig, MctsConfig, RolloutConfig, TabularEvaluator};
use once_cell::sync::Lazy;
use tracing::level_filters::LevelFilter;

use crate::arena::ArenaConfig;
use crate::benchmark::BenchmarkConfig;
use crate::self_play::SelfPlayConfig;
use crate::storage::INCUMBENT;
use crate::training_loop::LoopConfig;

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

fn default_data_dir() -> String {
    CENTRAL_CONFIG.common.data_dir.clone()
}

fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_seed() -> u64 {
    CENTRAL_CONFIG.common.seed
}

fn default_num_simulations() -> u32 {
    CENTRAL_CONFIG.mcts.num_simulations
}

fn default_self_play_games() -> u32 {
    CENTRAL_CONFIG.self_play.games
}

fn default_self_play_temperature() -> f32 {
    CENTRAL_CONFIG.self_play.temperature as f32
}

fn default_workers() -> usize {
    CENTRAL_CONFIG.self_play.workers
}

fn default_eval_games() -> u32 {
    CENTRAL_CONFIG.evaluation.games
}

fn default_eval_temperature() -> f32 {
    CENTRAL_CONFIG.evaluation.temperature as f32
}

fn default_benchmark_games() -> u32 {
    CENTRAL_CONFIG.evaluation.benchmark_games
}

fn default_cycles() -> u32 {
    CENTRAL_CONFIG.training.cycles
}

#[derive(Parser, Debug, Clone)]
#[command(name = "coach")]
#[command(about = "Gambit coach - self-play, arena evaluation and training loop")]
#[command(
    long_about = "Runs the self-improvement loop for tabular evaluators: self-play with
guided MCTS, training on the latest batch, candidate-vs-incumbent arena
matches and baseline benchmarks.

Configuration is loaded from config.toml with GAMBIT_* environment variable
overrides. CLI arguments take highest priority."
)]
pub struct Cli {
    /// Directory holding models/ and history.db
    #[arg(long, global = true, default_value_t = default_data_dir())]
    pub data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value_t = default_log_level())]
    pub log_level: String,

    /// Base seed for every RNG in the run
    #[arg(long, global = true, default_value_t = default_seed())]
    pub seed: u64,

    /// Guided MCTS simulations per move
    #[arg(long, global = true, default_value_t = default_num_simulations())]
    pub simulations: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the initial incumbent if none exists
    Init,
    /// Generate one self-play batch with the incumbent
    SelfPlay(SelfPlayArgs),
    /// Train a candidate on the latest batch
    Train,
    /// Play the candidate against the incumbent
    Evaluate(EvaluateArgs),
    /// Play a stored evaluator against the fixed baselines
    Benchmark(BenchmarkArgs),
    /// Run the full loop for a number of cycles
    Cycle(CycleArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SelfPlayArgs {
    /// Games per batch
    #[arg(long, default_value_t = default_self_play_games())]
    pub games: u32,

    /// Move sampling temperature (> 0)
    #[arg(long, default_value_t = default_self_play_temperature())]
    pub temperature: f32,

    /// Parallel game workers
    #[arg(long, default_value_t = default_workers())]
    pub workers: usize,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Arena games
    #[arg(long, default_value_t = default_eval_games())]
    pub games: u32,

    /// Move temperature for both sides (0 = greedy)
    #[arg(long, default_value_t = default_eval_temperature())]
    pub temperature: f32,

    /// Promote the candidate if it wins the match
    #[arg(long)]
    pub promote: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BenchmarkArgs {
    /// Games per baseline
    #[arg(long, default_value_t = default_benchmark_games())]
    pub games: u32,

    /// Stored evaluator to benchmark
    #[arg(long, default_value = INCUMBENT)]
    pub model: String,
}

#[derive(Args, Debug, Clone)]
pub struct CycleArgs {
    /// Number of cycles
    #[arg(long, default_value_t = default_cycles())]
    pub cycles: u32,

    /// Self-play games per cycle
    #[arg(long, default_value_t = default_self_play_games())]
    pub self_play_games: u32,

    /// Arena games per cycle
    #[arg(long, default_value_t = default_eval_games())]
    pub arena_games: u32,

    /// Skip baseline benchmarks after promotions
    #[arg(long)]
    pub no_benchmark: bool,
}

impl Cli {
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.is_empty() {
            return Err(anyhow!("data_dir cannot be empty"));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        let learning_rate = CENTRAL_CONFIG.training.learning_rate;
        if !(learning_rate > 0.0 && learning_rate <= 1.0) {
            return Err(anyhow!(
                "learning rate must be in (0, 1], got {}",
                learning_rate
            ));
        }

        self.loop_config().validate()
    }

    /// Empty table used when the data directory has no incumbent yet.
    pub fn initial_evaluator(&self) -> TabularEvaluator {
        TabularEvaluator::new(CENTRAL_CONFIG.training.learning_rate as f32)
    }

    /// Guided search settings shared by self-play, arena and benchmarks.
    pub fn mcts_config(&self) -> MctsConfig {
        let central = &CENTRAL_CONFIG.mcts;
        MctsConfig::default()
            .with_simulations(self.simulations)
            .with_c_puct(central.c_puct as f32)
            .with_dirichlet(
                central.dirichlet_alpha as f32,
                central.dirichlet_epsilon as f32,
            )
    }

    pub fn rollout_config(&self) -> RolloutConfig {
        let central = &CENTRAL_CONFIG.rollout;
        RolloutConfig {
            num_simulations: central.num_simulations,
            expansion_threshold: central.expansion_threshold,
            exploration: central.exploration as f32,
        }
    }

    pub fn exact_config(&self) -> ExactConfig {
        let central = &CENTRAL_CONFIG.exact;
        ExactConfig {
            transposition_table: central.transposition_table,
            max_depth: central.max_depth,
        }
    }

    /// Loop settings from the central config with this command's flags
    /// applied on top.
    pub fn loop_config(&self) -> LoopConfig {
        let central = &*CENTRAL_CONFIG;
        let mcts = self.mcts_config();

        let mut config = LoopConfig {
            cycles: central.training.cycles,
            self_play: SelfPlayConfig {
                games: central.self_play.games,
                workers: central.self_play.workers,
                mcts: mcts
                    .clone()
                    .with_temperature(central.self_play.temperature as f32),
                seed: self.seed,
            },
            arena: ArenaConfig::default()
                .with_games(central.evaluation.games)
                .with_temperature(central.evaluation.temperature as f32),
            mcts,
            benchmark: central.evaluation.benchmark_baselines.then(|| BenchmarkConfig {
                games: central.evaluation.benchmark_games,
                rollout: self.rollout_config(),
                exact: self.exact_config(),
            }),
            seed: self.seed,
        };

        match self.command {
            Command::SelfPlay(ref args) => {
                config.self_play.games = args.games;
                config.self_play.workers = args.workers;
                config.self_play.mcts.temperature = args.temperature;
            }
            Command::Evaluate(ref args) => {
                config.arena.games = args.games;
                config.arena.temperature = args.temperature;
            }
            Command::Benchmark(ref args) => {
                config.benchmark = Some(BenchmarkConfig {
                    games: args.games,
                    rollout: self.rollout_config(),
                    exact: self.exact_config(),
                });
            }
            Command::Cycle(ref args) => {
                config.cycles = args.cycles;
                config.self_play.games = args.self_play_games;
                config.arena.games = args.arena_games;
                if args.no_benchmark {
                    config.benchmark = None;
                }
            }
            Command::Init | Command::Train => {}
        }

        config
    }
}
