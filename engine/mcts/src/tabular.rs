//! Lookup-table evaluator trained from self-play examples.
//!
//! Each visited position (keyed by its mover-relative planes) stores a
//! policy and a value. Training blends the stored targets toward the
//! examples of a batch; positions never seen evaluate to a uniform policy
//! and value 0.

use std::collections::HashMap;

use engine_core::{position_key, GameState, History};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::evaluator::{EvalResult, Evaluator, EvaluatorError, Trainable};

/// Default step size for [`TabularEvaluator::train`].
pub const DEFAULT_LEARNING_RATE: f32 = 0.5;

/// Stored targets for one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub policy: Vec<f32>,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularEvaluator {
    #[serde(default = "default_learning_rate")]
    learning_rate: f32,
    #[serde(default)]
    entries: HashMap<String, TableEntry>,
}

fn default_learning_rate() -> f32 {
    DEFAULT_LEARNING_RATE
}

impl Default for TabularEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_LEARNING_RATE)
    }
}

impl TabularEvaluator {
    /// Create an empty table. `learning_rate` is clamped to `[0, 1]`.
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate: learning_rate.clamp(0.0, 1.0),
            entries: HashMap::new(),
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entry for a position key, if any.
    pub fn entry(&self, key: &str) -> Option<&TableEntry> {
        self.entries.get(key)
    }

    pub fn to_json(&self) -> Result<String, EvaluatorError> {
        serde_json::to_string(self).map_err(|e| EvaluatorError::EvaluationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, EvaluatorError> {
        serde_json::from_str(json).map_err(|e| EvaluatorError::InvalidState(e.to_string()))
    }
}

impl<S: GameState> Evaluator<S> for TabularEvaluator {
    fn evaluate(&self, state: &S) -> Result<EvalResult, EvaluatorError> {
        let (own, opponent) = state.planes();
        match self.entries.get(&position_key(&own, &opponent)) {
            Some(entry) => {
                if entry.policy.len() != S::NUM_ACTIONS {
                    return Err(EvaluatorError::InvalidState(format!(
                        "stored policy has {} entries, expected {}",
                        entry.policy.len(),
                        S::NUM_ACTIONS
                    )));
                }
                Ok(EvalResult {
                    policy: entry.policy.clone(),
                    value: entry.value.clamp(-1.0, 1.0),
                })
            }
            None => Ok(EvalResult::uniform(state)),
        }
    }
}

impl Trainable for TabularEvaluator {
    fn train(&self, history: &History) -> Result<Self, EvaluatorError> {
        let mut trained = self.clone();
        let lr = self.learning_rate;
        let mut inserted = 0usize;
        let mut updated = 0usize;

        for (idx, example) in history.examples().iter().enumerate() {
            if !(-1.0..=1.0).contains(&example.outcome) {
                return Err(EvaluatorError::InvalidExample(format!(
                    "example {} has outcome {} outside [-1, 1]",
                    idx, example.outcome
                )));
            }

            match trained.entries.get_mut(&example.position_key()) {
                Some(entry) => {
                    if entry.policy.len() != example.policy.len() {
                        return Err(EvaluatorError::InvalidExample(format!(
                            "example {} has {} policy entries, table has {}",
                            idx,
                            example.policy.len(),
                            entry.policy.len()
                        )));
                    }
                    for (p, &target) in entry.policy.iter_mut().zip(&example.policy) {
                        *p += lr * (target - *p);
                    }
                    entry.value += lr * (example.outcome - entry.value);
                    updated += 1;
                }
                None => {
                    trained.entries.insert(
                        example.position_key(),
                        TableEntry {
                            policy: example.policy.clone(),
                            value: example.outcome,
                        },
                    );
                    inserted += 1;
                }
            }
        }

        debug!(
            examples = history.len(),
            inserted,
            updated,
            table_size = trained.len(),
            "Trained tabular evaluator"
        );

        Ok(trained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Example;
    use games_tictactoe::{play_moves, State};

    fn example(state: &State, best: usize, outcome: f32) -> Example {
        let mut policy = vec![0.0; 9];
        policy[best] = 1.0;
        let mut example = Example::new(state, policy);
        example.outcome = outcome;
        example
    }

    #[test]
    fn test_unseen_state_is_uniform() {
        let table = TabularEvaluator::default();
        let state = play_moves(&[4]).unwrap();
        let result = table.evaluate(&state).unwrap();
        assert_eq!(result, EvalResult::uniform(&state));
    }

    #[test]
    fn test_train_inserts_then_blends() {
        let state = State::new();
        let table = TabularEvaluator::new(0.5);

        let first = table
            .train(&History::from_examples(vec![example(&state, 4, 1.0)]))
            .unwrap();
        let result = first.evaluate(&state).unwrap();
        assert!((result.policy[4] - 1.0).abs() < 1e-6);
        assert!((result.value - 1.0).abs() < 1e-6);

        let second = first
            .train(&History::from_examples(vec![example(&state, 0, -1.0)]))
            .unwrap();
        let result = second.evaluate(&state).unwrap();
        assert!((result.policy[4] - 0.5).abs() < 1e-6);
        assert!((result.policy[0] - 0.5).abs() < 1e-6);
        assert!(result.value.abs() < 1e-6);

        // Training never mutates the starting table
        assert!(table.is_empty());
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_train_rejects_bad_outcome() {
        let table = TabularEvaluator::default();
        let bad = example(&State::new(), 0, 2.0);
        assert!(table.train(&History::from_examples(vec![bad])).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let state = play_moves(&[0, 4]).unwrap();
        let table = TabularEvaluator::default()
            .train(&History::from_examples(vec![example(&state, 8, 0.0)]))
            .unwrap();

        let json = table.to_json().unwrap();
        let restored = TabularEvaluator::from_json(&json).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_mismatched_policy_length_is_error() {
        let mut table = TabularEvaluator::default();
        table.entries.insert(
            position_key(&[0; 9], &[0; 9]),
            TableEntry {
                policy: vec![1.0],
                value: 0.0,
            },
        );
        assert!(Evaluator::<State>::evaluate(&table, &State::new()).is_err());
    }
}
