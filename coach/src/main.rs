//! coach - Gambit training driver
//!
//! Subcommands map onto the phases of the training loop:
//! 1. `init` creates an empty incumbent under `<data_dir>/models/`
//! 2. `self-play` appends a batch to `<data_dir>/history.db`
//! 3. `train` fits a candidate on the latest batch
//! 4. `evaluate` plays candidate against incumbent (optionally promoting)
//! 5. `benchmark` plays a stored evaluator against fixed baselines
//! 6. `cycle` runs all of the above for N cycles

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use games_tictactoe::State;
use mcts::TabularEvaluator;
use serde::Serialize;
use tracing::{error, info};

use coach::config::{Cli, Command};
use coach::storage::{ArtifactStore, LocalArtifactStore};
use coach::{should_promote, TrainingLoop};

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Reports go to stdout as JSON; logs stay on stderr.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let store: Arc<dyn ArtifactStore> = Arc::new(LocalArtifactStore::open(&cli.data_dir)?);
    let training = TrainingLoop::<State, TabularEvaluator>::new(
        Arc::clone(&store),
        cli.loop_config(),
        cli.initial_evaluator(),
    )?;
    // Stored batch count doubles as the cycle index for one-off phases,
    // so repeated invocations draw fresh seeds.
    let cycle = store.batch_count().await? as u32;

    match cli.command {
        Command::Init => {
            let created = training.init().await?;
            print_json(&serde_json::json!({ "created": created }))?;
        }
        Command::SelfPlay(_) => {
            let (batch, examples) = training.self_play(cycle).await?;
            print_json(&serde_json::json!({ "batch": batch, "examples": examples }))?;
        }
        Command::Train => {
            let candidate = training.train().await?;
            print_json(&serde_json::json!({ "positions": candidate.len() }))?;
        }
        Command::Evaluate(ref args) => {
            let report = training.evaluate(cycle).await?;
            let promote = should_promote(&report);
            if promote && args.promote {
                store.promote().await?;
            }
            print_json(&serde_json::json!({
                "arena": report,
                "wins_match": promote,
                "promoted": promote && args.promote,
            }))?;
        }
        Command::Benchmark(ref args) => {
            let reports = training.benchmark(&args.model, cycle).await?;
            print_json(&reports)?;
        }
        Command::Cycle(_) => {
            let reports = training.run().await?;
            print_json(&reports)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let cli = Cli::parse();

    // Validate configuration
    cli.validate()?;

    // Initialize tracing
    init_tracing(&cli.log_level)?;
    info!(
        log_level = %cli.log_level,
        data_dir = %cli.data_dir,
        seed = cli.seed,
        "Tracing initialized"
    );

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("coach failed: {:#}", e);
            Err(e)
        }
    }
}
