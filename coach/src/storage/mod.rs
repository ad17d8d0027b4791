//! Artifact storage for evaluators and self-play history.
//!
//! Two evaluator slots matter to the training loop: [`INCUMBENT`], the
//! evaluator that generates data, and [`CANDIDATE`], the freshly trained
//! challenger. Stores keep checkpoints as opaque JSON bytes, so any serde
//! evaluator fits through [`EvaluatorStore`]. History is appended as named
//! batches; training only ever reads the most recent one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use coach::storage::{ArtifactStore, EvaluatorStore, LocalArtifactStore, INCUMBENT};
//!
//! let store = LocalArtifactStore::open("./data")?;
//! let incumbent: TabularEvaluator = store.load_evaluator(INCUMBENT).await?;
//! let batch = store.append_history(&history).await?;
//! ```

mod local;
mod memory;

pub use local::LocalArtifactStore;
pub use memory::MemoryArtifactStore;

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use engine_core::History;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Evaluator currently generating self-play data
pub const INCUMBENT: &str = "incumbent";
/// Evaluator trained in the current cycle
pub const CANDIDATE: &str = "candidate";

/// A stored self-play batch.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBatch {
    pub name: String,
    pub history: History,
}

/// Abstract interface for checkpoint and history storage.
///
/// Missing artifacts are errors; callers decide whether that is fatal.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Raw checkpoint bytes saved under `name`
    async fn load_checkpoint(&self, name: &str) -> Result<Vec<u8>>;

    /// Save (or overwrite) the checkpoint under `name`
    async fn save_checkpoint(&self, name: &str, bytes: &[u8]) -> Result<()>;

    async fn has_evaluator(&self, name: &str) -> Result<bool>;

    /// Replace the incumbent with the candidate in one step
    async fn promote(&self) -> Result<()>;

    /// Store a batch and return its name
    async fn append_history(&self, history: &History) -> Result<String>;

    /// The most recently appended batch
    async fn latest_history(&self) -> Result<HistoryBatch>;

    /// Number of stored batches
    async fn batch_count(&self) -> Result<usize>;
}

/// Typed evaluator access on top of any [`ArtifactStore`].
#[async_trait]
pub trait EvaluatorStore {
    async fn load_evaluator<E>(&self, name: &str) -> Result<E>
    where
        E: DeserializeOwned + Send;

    async fn save_evaluator<E>(&self, name: &str, evaluator: &E) -> Result<()>
    where
        E: Serialize + Sync;
}

#[async_trait]
impl<T: ArtifactStore + ?Sized> EvaluatorStore for T {
    async fn load_evaluator<E>(&self, name: &str) -> Result<E>
    where
        E: DeserializeOwned + Send,
    {
        let bytes = self.load_checkpoint(name).await?;
        serde_json::from_slice(&bytes).with_context(|| format!("corrupt checkpoint '{}'", name))
    }

    async fn save_evaluator<E>(&self, name: &str, evaluator: &E) -> Result<()>
    where
        E: Serialize + Sync,
    {
        let bytes = serde_json::to_vec(evaluator)
            .with_context(|| format!("failed to serialize evaluator '{}'", name))?;
        self.save_checkpoint(name, &bytes).await
    }
}

/// Seconds since the unix epoch at batch generation.
pub(crate) fn generation_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Name for the `seq`-th stored batch (1-based), generated at `timestamp`.
///
/// The zero-padded sequence comes first so names sort in append order.
pub fn batch_name(seq: u64, timestamp: u64) -> String {
    format!("batch-{:06}-{}", seq, timestamp)
}

/// Policy vectors are stored as little-endian f32 bytes.
pub(crate) fn encode_policy(policy: &[f32]) -> Vec<u8> {
    policy.iter().flat_map(|p| p.to_le_bytes()).collect()
}

pub(crate) fn decode_policy(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(anyhow!(
            "policy blob length {} is not a multiple of 4",
            bytes.len()
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
