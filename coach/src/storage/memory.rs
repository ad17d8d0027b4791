//! In-process store for tests and throwaway runs.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use engine_core::History;

use super::{
    batch_name, generation_timestamp, validate_name, ArtifactStore, HistoryBatch, CANDIDATE,
    INCUMBENT,
};

#[derive(Default)]
pub struct MemoryArtifactStore {
    checkpoints: Mutex<HashMap<String, Vec<u8>>>,
    batches: Mutex<Vec<HistoryBatch>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn load_checkpoint(&self, name: &str) -> Result<Vec<u8>> {
        let checkpoints = self
            .checkpoints
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        checkpoints
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("no evaluator named '{}'", name))
    }

    async fn save_checkpoint(&self, name: &str, bytes: &[u8]) -> Result<()> {
        validate_name(name)?;
        self.checkpoints
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn has_evaluator(&self, name: &str) -> Result<bool> {
        let checkpoints = self
            .checkpoints
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        Ok(checkpoints.contains_key(name))
    }

    async fn promote(&self) -> Result<()> {
        let mut checkpoints = self
            .checkpoints
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let candidate = checkpoints
            .get(CANDIDATE)
            .cloned()
            .ok_or_else(|| anyhow!("cannot promote: no candidate stored"))?;
        checkpoints.insert(INCUMBENT.to_string(), candidate);
        Ok(())
    }

    async fn append_history(&self, history: &History) -> Result<String> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let name = batch_name(batches.len() as u64 + 1, generation_timestamp());
        batches.push(HistoryBatch {
            name: name.clone(),
            history: history.clone(),
        });
        Ok(name)
    }

    async fn latest_history(&self) -> Result<HistoryBatch> {
        self.batches
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?
            .last()
            .cloned()
            .ok_or_else(|| anyhow!("no history batches stored"))
    }

    async fn batch_count(&self) -> Result<usize> {
        Ok(self
            .batches
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?
            .len())
    }
}
