//! On-disk store: JSON checkpoints plus an SQLite history database.
//!
//! Layout under the data directory:
//!
//! ```text
//! models/incumbent.json
//! models/candidate.json
//! history.db
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use engine_core::{Example, History};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{
    batch_name, decode_policy, encode_policy, generation_timestamp, validate_name, ArtifactStore,
    HistoryBatch, CANDIDATE, INCUMBENT,
};

/// Local filesystem artifact store.
///
/// The SQLite connection sits behind a Mutex since rusqlite Connection is
/// not Sync.
pub struct LocalArtifactStore {
    models_dir: PathBuf,
    conn: Mutex<Connection>,
}

impl LocalArtifactStore {
    /// Open the store rooted at `data_dir`, creating directories and
    /// tables if needed.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let models_dir = data_dir.join("models");
        fs::create_dir_all(&models_dir)
            .with_context(|| format!("failed to create {}", models_dir.display()))?;

        let db_path = data_dir.join("history.db");
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS batches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL,
                num_examples INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS examples (
                batch_id INTEGER NOT NULL REFERENCES batches(id),
                ply_index INTEGER NOT NULL,
                own BLOB NOT NULL,
                opponent BLOB NOT NULL,
                policy BLOB NOT NULL,
                outcome REAL NOT NULL,
                PRIMARY KEY (batch_id, ply_index)
            )",
            [],
        )?;

        debug!(path = %data_dir.display(), "Opened artifact store");

        Ok(Self {
            models_dir,
            conn: Mutex::new(conn),
        })
    }

    /// Path of the checkpoint for `name`
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.models_dir.join(format!("{}.json", name))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.models_dir.join(format!("{}.json.tmp", name))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn load_checkpoint(&self, name: &str) -> Result<Vec<u8>> {
        validate_name(name)?;
        let path = self.model_path(name);
        let bytes = fs::read(&path)
            .with_context(|| format!("failed to read evaluator '{}' from {}", name, path.display()))?;
        debug!(name, bytes = bytes.len(), "Loaded checkpoint");
        Ok(bytes)
    }

    async fn save_checkpoint(&self, name: &str, bytes: &[u8]) -> Result<()> {
        validate_name(name)?;
        let tmp = self.temp_path(name);
        let path = self.model_path(name);

        fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move checkpoint into {}", path.display()))?;

        debug!(name, bytes = bytes.len(), "Saved checkpoint");
        Ok(())
    }

    async fn has_evaluator(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        Ok(self.model_path(name).is_file())
    }

    async fn promote(&self) -> Result<()> {
        let candidate = self.model_path(CANDIDATE);
        if !candidate.is_file() {
            return Err(anyhow!(
                "cannot promote: no candidate at {}",
                candidate.display()
            ));
        }

        // Stage a copy, then rename over the incumbent
        let tmp = self.temp_path(INCUMBENT);
        fs::copy(&candidate, &tmp)
            .with_context(|| format!("failed to stage {}", tmp.display()))?;
        fs::rename(&tmp, self.model_path(INCUMBENT)).context("failed to replace incumbent")?;

        info!("Promoted candidate to incumbent");
        Ok(())
    }

    async fn append_history(&self, history: &History) -> Result<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let tx = conn.unchecked_transaction()?;

        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(id), 0) + 1 FROM batches",
            [],
            |row| row.get(0),
        )?;
        let created_at = generation_timestamp();
        let name = batch_name(next as u64, created_at);

        tx.execute(
            "INSERT INTO batches (id, name, created_at, num_examples) VALUES (?1, ?2, ?3, ?4)",
            params![next, name, created_at as i64, history.len() as i64],
        )?;

        // Prepare the INSERT statement once and reuse it for the whole batch
        let mut stmt = tx.prepare_cached(
            "INSERT INTO examples (batch_id, ply_index, own, opponent, policy, outcome)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (ply_index, example) in history.examples().iter().enumerate() {
            stmt.execute(params![
                next,
                ply_index as i64,
                example.own,
                example.opponent,
                encode_policy(&example.policy),
                example.outcome as f64,
            ])?;
        }
        drop(stmt);
        tx.commit()?;

        info!(batch = %name, examples = history.len(), "Stored history batch");
        Ok(name)
    }

    async fn latest_history(&self) -> Result<HistoryBatch> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let latest: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, name FROM batches ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (batch_id, name) = latest.ok_or_else(|| anyhow!("no history batches stored"))?;

        let mut stmt = conn.prepare_cached(
            "SELECT own, opponent, policy, outcome FROM examples
             WHERE batch_id = ?1 ORDER BY ply_index",
        )?;
        let rows = stmt.query_map(params![batch_id], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut examples = Vec::new();
        for row in rows {
            let (own, opponent, policy, outcome) = row?;
            examples.push(Example {
                own,
                opponent,
                policy: decode_policy(&policy)
                    .with_context(|| format!("corrupt example in batch '{}'", name))?,
                outcome: outcome as f32,
            });
        }

        debug!(batch = %name, examples = examples.len(), "Loaded history batch");
        Ok(HistoryBatch {
            name,
            history: History::from_examples(examples),
        })
    }

    async fn batch_count(&self) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM batches", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EvaluatorStore;
    use engine_core::GameState;
    use games_tictactoe::{play_moves, State};
    use mcts::{TabularEvaluator, Trainable};
    use tempfile::tempdir;

    fn sample_history(moves: &[u8]) -> History {
        let mut history = History::new();
        for n in 0..=moves.len() {
            let state: State = play_moves(&moves[..n]).unwrap();
            let mut policy = vec![0.0; 9];
            for &a in &state.legal_actions() {
                policy[a as usize] = 1.0 / state.legal_actions().len() as f32;
            }
            let mut example = Example::new(&state, policy);
            example.outcome = if n % 2 == 0 { 1.0 } else { -1.0 };
            history.extend([example]);
        }
        history
    }

    #[tokio::test]
    async fn test_open_creates_layout() {
        let temp_dir = tempdir().unwrap();
        let _store = LocalArtifactStore::open(temp_dir.path()).unwrap();
        assert!(temp_dir.path().join("models").is_dir());
        assert!(temp_dir.path().join("history.db").is_file());
    }

    #[tokio::test]
    async fn test_save_and_load_evaluator() {
        let temp_dir = tempdir().unwrap();
        let store = LocalArtifactStore::open(temp_dir.path()).unwrap();

        assert!(!store.has_evaluator(INCUMBENT).await.unwrap());
        let evaluator = TabularEvaluator::new(0.3);
        store.save_evaluator(INCUMBENT, &evaluator).await.unwrap();

        assert!(store.has_evaluator(INCUMBENT).await.unwrap());
        assert!(!store.model_path(INCUMBENT).with_extension("json.tmp").exists());
        let loaded: TabularEvaluator = store.load_evaluator(INCUMBENT).await.unwrap();
        assert_eq!(loaded, evaluator);
    }

    #[tokio::test]
    async fn test_missing_evaluator_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let store = LocalArtifactStore::open(temp_dir.path()).unwrap();
        let err = store.load_checkpoint(CANDIDATE).await.unwrap_err();
        assert!(err.to_string().contains("candidate"));
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let store = LocalArtifactStore::open(temp_dir.path()).unwrap();
        fs::write(store.model_path(INCUMBENT), "{not json").unwrap();
        let loaded: Result<TabularEvaluator> = store.load_evaluator(INCUMBENT).await;
        assert!(loaded.is_err());
    }

    #[tokio::test]
    async fn test_promote_replaces_incumbent() {
        let temp_dir = tempdir().unwrap();
        let store = LocalArtifactStore::open(temp_dir.path()).unwrap();

        assert!(store.promote().await.is_err());

        let incumbent = TabularEvaluator::new(0.5);
        let candidate = incumbent.train(&sample_history(&[4, 0, 8])).unwrap();
        store.save_evaluator(INCUMBENT, &incumbent).await.unwrap();
        store.save_evaluator(CANDIDATE, &candidate).await.unwrap();

        store.promote().await.unwrap();
        let promoted: TabularEvaluator = store.load_evaluator(INCUMBENT).await.unwrap();
        assert_eq!(promoted, candidate);
        assert!(store.has_evaluator(CANDIDATE).await.unwrap());
    }

    #[tokio::test]
    async fn test_latest_history_returns_last_batch() {
        let temp_dir = tempdir().unwrap();
        let store = LocalArtifactStore::open(temp_dir.path()).unwrap();

        assert!(store.latest_history().await.is_err());

        let first = sample_history(&[0, 1]);
        let second = sample_history(&[4, 0, 8, 2]);
        let first_name = store.append_history(&first).await.unwrap();
        let second_name = store.append_history(&second).await.unwrap();
        assert!(first_name.starts_with("batch-000001-"));
        assert!(second_name.starts_with("batch-000002-"));
        assert!(first_name < second_name);
        assert_eq!(store.batch_count().await.unwrap(), 2);

        let latest = store.latest_history().await.unwrap();
        assert_eq!(latest.name, second_name);
        assert_eq!(latest.history, second);
    }

    #[tokio::test]
    async fn test_batch_name_matches_created_at() {
        let temp_dir = tempdir().unwrap();
        let store = LocalArtifactStore::open(temp_dir.path()).unwrap();
        let name = store.append_history(&sample_history(&[4])).await.unwrap();

        let created_at: i64 = store
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT created_at FROM batches WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(name, batch_name(1, created_at as u64));
    }

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        let history = sample_history(&[2, 4, 6]);
        {
            let store = LocalArtifactStore::open(temp_dir.path()).unwrap();
            store.append_history(&history).await.unwrap();
        }

        let store = LocalArtifactStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.batch_count().await.unwrap(), 1);
        assert_eq!(store.latest_history().await.unwrap().history, history);
        let next = store.append_history(&history).await.unwrap();
        assert!(next.starts_with("batch-000002-"));
    }

    #[tokio::test]
    async fn test_invalid_name_rejected() {
        let temp_dir = tempdir().unwrap();
        let store = LocalArtifactStore::open(temp_dir.path()).unwrap();
        let evaluator = TabularEvaluator::default();
        assert!(store.save_evaluator("../escape", &evaluator).await.is_err());
    }
}
