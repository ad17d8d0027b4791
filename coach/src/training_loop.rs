//! The self-improvement loop.
//!
//! Each cycle walks `SelfPlay -> Train -> Evaluate -> (Promote | Skip)`.
//! Phases run strictly in sequence; only self-play fans out across workers.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use engine_core::GameState;
use mcts::{Evaluator, GuidedMctsSelector, MctsConfig, Trainable};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::arena::{should_promote, Arena, ArenaConfig, ArenaReport};
use crate::benchmark::{run_baselines, BaselineReport, BenchmarkConfig};
use crate::self_play::{SelfPlayConfig, SelfPlayEngine};
use crate::storage::{ArtifactStore, EvaluatorStore, CANDIDATE, INCUMBENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SelfPlay,
    Train,
    Evaluate,
    Promote,
    Skip,
}

impl Phase {
    /// Phase that follows this one. `promote` only matters after Evaluate.
    pub fn next(self, promote: bool) -> Phase {
        match self {
            Phase::SelfPlay => Phase::Train,
            Phase::Train => Phase::Evaluate,
            Phase::Evaluate if promote => Phase::Promote,
            Phase::Evaluate => Phase::Skip,
            Phase::Promote | Phase::Skip => Phase::SelfPlay,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::SelfPlay => "self_play",
            Phase::Train => "train",
            Phase::Evaluate => "evaluate",
            Phase::Promote => "promote",
            Phase::Skip => "skip",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub cycles: u32,
    pub self_play: SelfPlayConfig,
    pub arena: ArenaConfig,
    /// Search settings for arena and benchmark selectors
    pub mcts: MctsConfig,
    /// None skips baseline benchmarks after promotion
    pub benchmark: Option<BenchmarkConfig>,
    pub seed: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cycles: 10,
            self_play: SelfPlayConfig::default(),
            arena: ArenaConfig::default(),
            mcts: MctsConfig::default(),
            benchmark: Some(BenchmarkConfig::default()),
            seed: 42,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        self.self_play.validate()?;
        self.arena.validate()?;
        self.mcts.validate()?;
        if let Some(ref benchmark) = self.benchmark {
            if benchmark.games == 0 {
                return Err(anyhow!("benchmark games must be greater than 0"));
            }
            benchmark.rollout.validate()?;
        }
        Ok(())
    }
}

/// What happened in one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u32,
    pub batch: String,
    pub examples: usize,
    pub arena: ArenaReport,
    pub promoted: bool,
    /// Empty unless the cycle promoted and benchmarks are enabled
    pub baselines: Vec<BaselineReport>,
}

/// Seed for `stream` within `cycle`, so every phase gets its own RNG.
pub fn derive_seed(base: u64, cycle: u32, stream: u64) -> u64 {
    base ^ ((cycle as u64) << 32) ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Drives cycles for game `S` with evaluators of type `E`.
///
/// `initial` is stored as the incumbent when the store has none.
pub struct TrainingLoop<S, E> {
    store: Arc<dyn ArtifactStore>,
    config: LoopConfig,
    initial: E,
    _game: PhantomData<fn() -> S>,
}

impl<S, E> TrainingLoop<S, E>
where
    S: GameState + Default,
    E: Evaluator<S> + Trainable + Serialize + DeserializeOwned + 'static,
{
    pub fn new(store: Arc<dyn ArtifactStore>, config: LoopConfig, initial: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            initial,
            _game: PhantomData,
        })
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Create an empty incumbent if none is stored. Returns true if created.
    pub async fn init(&self) -> Result<bool> {
        if self.store.has_evaluator(INCUMBENT).await? {
            debug!("Incumbent already present");
            return Ok(false);
        }
        self.store.save_evaluator(INCUMBENT, &self.initial).await?;
        info!("Created initial incumbent");
        Ok(true)
    }

    /// Generate and store one batch with the incumbent. Returns the batch
    /// name and its example count.
    pub async fn self_play(&self, cycle: u32) -> Result<(String, usize)> {
        let incumbent: E = self
            .store
            .load_evaluator(INCUMBENT)
            .await
            .context("self-play needs an incumbent; run init first")?;
        let incumbent = Arc::new(incumbent);

        let config = SelfPlayConfig {
            seed: derive_seed(self.config.seed, cycle, 0),
            ..self.config.self_play.clone()
        };
        let engine = SelfPlayEngine::<S, E>::new(incumbent, config)?;
        let history = engine.run_batch().await?;

        let batch = self.store.append_history(&history).await?;
        Ok((batch, history.len()))
    }

    /// Train a candidate from the incumbent on the latest batch and store it.
    pub async fn train(&self) -> Result<E> {
        let incumbent: E = self.store.load_evaluator(INCUMBENT).await?;
        let latest = self.store.latest_history().await?;

        let candidate = incumbent
            .train(&latest.history)
            .with_context(|| format!("training on batch '{}' failed", latest.name))?;
        self.store.save_evaluator(CANDIDATE, &candidate).await?;

        info!(
            batch = %latest.name,
            examples = latest.history.len(),
            "Trained candidate"
        );
        Ok(candidate)
    }

    /// Arena match: candidate against incumbent, both wrapped in guided search.
    pub async fn evaluate(&self, cycle: u32) -> Result<ArenaReport> {
        let candidate: Arc<E> = Arc::new(self.store.load_evaluator(CANDIDATE).await?);
        let incumbent: Arc<E> = Arc::new(self.store.load_evaluator(INCUMBENT).await?);

        let arena = Arena::new(self.config.arena.clone())?;
        let mcts = self
            .config
            .mcts
            .clone()
            .with_temperature(self.config.arena.temperature);
        let mut candidate = GuidedMctsSelector::new(
            candidate,
            mcts.clone(),
            derive_seed(self.config.seed, cycle, 1),
        )
        .with_name(CANDIDATE);
        let mut incumbent =
            GuidedMctsSelector::new(incumbent, mcts, derive_seed(self.config.seed, cycle, 2))
                .with_name(INCUMBENT);

        tokio::task::spawn_blocking(move || {
            arena.evaluate::<S, _, _>(&mut candidate, &mut incumbent)
        })
        .await
        .context("arena task panicked")?
    }

    /// Benchmark the stored evaluator `name` against the fixed baselines.
    pub async fn benchmark(&self, name: &str, cycle: u32) -> Result<Vec<BaselineReport>> {
        let config = self
            .config
            .benchmark
            .clone()
            .unwrap_or_default();
        let evaluator: Arc<E> = Arc::new(self.store.load_evaluator(name).await?);
        let mcts = self.config.mcts.clone();
        let seed = derive_seed(self.config.seed, cycle, 3);

        tokio::task::spawn_blocking(move || {
            run_baselines::<S, E>(evaluator, &mcts, &config, seed)
        })
        .await
        .context("benchmark task panicked")?
    }

    /// Run one full cycle.
    pub async fn run_cycle(&self, cycle: u32) -> Result<CycleReport> {
        let mut phase = Phase::SelfPlay;
        info!(cycle, %phase, "Cycle started");
        let (batch, examples) = self.self_play(cycle).await?;

        phase = phase.next(false);
        info!(cycle, %phase, "Entering phase");
        self.train().await?;

        phase = phase.next(false);
        info!(cycle, %phase, "Entering phase");
        let arena = self.evaluate(cycle).await?;

        let promoted = should_promote(&arena);
        phase = phase.next(promoted);
        info!(cycle, %phase, average = arena.average, "Entering phase");

        let mut baselines = Vec::new();
        if phase == Phase::Promote {
            self.store.promote().await?;
            if self.config.benchmark.is_some() {
                baselines = self.benchmark(INCUMBENT, cycle).await?;
            }
        }

        Ok(CycleReport {
            cycle,
            batch,
            examples,
            arena,
            promoted,
            baselines,
        })
    }

    /// Run `cycles` cycles, creating the incumbent first if needed.
    ///
    /// Cycle numbers continue from the stored batch count, so a rerun on
    /// the same store draws fresh seeds.
    pub async fn run(&self) -> Result<Vec<CycleReport>> {
        self.init().await?;

        let start = self.store.batch_count().await? as u32;
        let mut reports = Vec::with_capacity(self.config.cycles as usize);
        for cycle in start..start + self.config.cycles {
            let report = self
                .run_cycle(cycle)
                .await
                .with_context(|| format!("cycle {} failed", cycle))?;
            info!(
                cycle,
                batch = %report.batch,
                examples = report.examples,
                average = report.arena.average,
                promoted = report.promoted,
                "Cycle complete"
            );
            reports.push(report);
        }

        let promotions = reports.iter().filter(|r| r.promoted).count();
        info!(cycles = self.config.cycles, promotions, "Training loop finished");
        Ok(reports)
    }
}
