//! Evaluator trait for position evaluation.
//!
//! The evaluator provides policy (action probabilities) and value estimates
//! for game states. In a full system this is a neural network; this crate
//! ships a uniform evaluator and a trainable lookup table.

use engine_core::{Action, GameState, History};
use thiserror::Error;

/// Total prior mass on legal actions at or below which the policy is
/// treated as degenerate and replaced by a uniform prior.
pub const DEGENERATE_POLICY_EPSILON: f32 = 1e-8;

/// Errors that can occur during evaluation or training.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid training example: {0}")]
    InvalidExample(String),
}

/// Result of evaluating a game state.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    /// Policy: probability distribution over the full action space.
    /// Index i corresponds to action i. Illegal actions should be 0.0.
    pub policy: Vec<f32>,

    /// Value estimate for the side to move.
    /// Range: -1.0 (certain loss) to +1.0 (certain win).
    pub value: f32,
}

impl EvalResult {
    /// Uniform policy over the legal actions of `state`, value 0.
    pub fn uniform<S: GameState>(state: &S) -> Self {
        let mask = state.legal_mask();
        let legal = mask.iter().filter(|&&m| m).count();
        let prob = if legal == 0 { 0.0 } else { 1.0 / legal as f32 };
        let policy = mask.iter().map(|&m| if m { prob } else { 0.0 }).collect();
        Self { policy, value: 0.0 }
    }
}

/// Trait for position evaluators.
///
/// Implementations:
/// - UniformEvaluator: equal priors, neutral value (for testing and bootstrapping)
/// - TabularEvaluator: per-position lookup table learned from self-play
pub trait Evaluator<S: GameState>: Send + Sync {
    /// Evaluate a state from the perspective of its side to move.
    fn evaluate(&self, state: &S) -> Result<EvalResult, EvaluatorError>;
}

/// An evaluator that can be fitted to a batch of self-play examples.
pub trait Trainable: Sized {
    /// Produce a new evaluator trained on `history`, starting from `self`.
    fn train(&self, history: &History) -> Result<Self, EvaluatorError>;
}

/// Uniform evaluator that assigns equal probability to all legal moves.
/// Value is always 0.0 (neutral). Useful for testing search without a model.
#[derive(Debug, Clone, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl<S: GameState> Evaluator<S> for UniformEvaluator {
    fn evaluate(&self, state: &S) -> Result<EvalResult, EvaluatorError> {
        Ok(EvalResult::uniform(state))
    }
}

/// Renormalise `policy` over the `legal` actions.
///
/// Returns one prior per entry of `legal`, or `None` when the legal mass is
/// degenerate (at most [`DEGENERATE_POLICY_EPSILON`]) or `legal` is empty.
pub fn legal_priors(policy: &[f32], legal: &[Action]) -> Option<Vec<f32>> {
    let masses: Vec<f32> = legal
        .iter()
        .map(|&a| policy.get(a as usize).copied().unwrap_or(0.0).max(0.0))
        .collect();

    let total: f32 = masses.iter().sum();
    if legal.is_empty() || !total.is_finite() || total <= DEGENERATE_POLICY_EPSILON {
        return None;
    }

    Some(masses.into_iter().map(|m| m / total).collect())
}
