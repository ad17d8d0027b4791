//! Training dataset produced by self-play.
//!
//! An [`Example`] pairs a mover-relative board encoding with the search
//! policy recorded at that ply and the final game outcome from the mover's
//! perspective. A [`History`] is an append-ordered batch of examples.

use serde::{Deserialize, Serialize};

use crate::typed::GameState;

/// One training datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Occupancy of the side to move (0/1 per cell)
    pub own: Vec<u8>,
    /// Occupancy of the previous mover (0/1 per cell)
    pub opponent: Vec<u8>,
    /// Search policy over the full action space; zero on illegal slots
    pub policy: Vec<f32>,
    /// Game outcome for the side to move: -1, 0 or +1.
    /// Zero until the generating game finishes.
    pub outcome: f32,
}

impl Example {
    /// Snapshot `state` with the search `policy`; outcome is filled in later.
    pub fn new<S: GameState>(state: &S, policy: Vec<f32>) -> Self {
        let (own, opponent) = state.planes();
        Self {
            own,
            opponent,
            policy,
            outcome: 0.0,
        }
    }

    /// Key identifying the encoded position, e.g. `"100000000/000010000"`.
    pub fn position_key(&self) -> String {
        position_key(&self.own, &self.opponent)
    }
}

/// Stable text key for a pair of occupancy planes.
pub fn position_key(own: &[u8], opponent: &[u8]) -> String {
    let mut key = String::with_capacity(own.len() + opponent.len() + 1);
    key.extend(own.iter().map(|&b| if b != 0 { '1' } else { '0' }));
    key.push('/');
    key.extend(opponent.iter().map(|&b| if b != 0 { '1' } else { '0' }));
    key
}

/// Append-ordered sequence of examples from one or more games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    examples: Vec<Example>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_examples(examples: Vec<Example>) -> Self {
        Self { examples }
    }

    pub fn extend(&mut self, examples: impl IntoIterator<Item = Example>) {
        self.examples.extend(examples);
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn into_examples(self) -> Vec<Example> {
        self.examples
    }
}
