//! Gambit coach: self-play, arena evaluation and the training loop.
//!
//! Everything here is driven by the `coach` binary, but the pieces are
//! usable on their own:
//!
//! - [`self_play`] generates training examples with guided search
//! - [`arena`] scores two action selectors with seat swapping
//! - [`benchmark`] measures an evaluator against fixed baselines
//! - [`storage`] persists evaluators and self-play history
//! - [`training_loop`] ties them together into promotion cycles

pub mod arena;
pub mod benchmark;
pub mod config;
pub mod self_play;
pub mod storage;
pub mod training_loop;

pub use arena::{should_promote, Arena, ArenaConfig, ArenaReport, PROMOTION_THRESHOLD};
pub use benchmark::{run_baselines, BaselineReport, BenchmarkConfig};
pub use self_play::{assign_outcomes, GameRecord, SelfPlayConfig, SelfPlayEngine};
pub use storage::{
    ArtifactStore, EvaluatorStore, HistoryBatch, LocalArtifactStore, MemoryArtifactStore,
};
pub use training_loop::{CycleReport, LoopConfig, Phase, TrainingLoop};
