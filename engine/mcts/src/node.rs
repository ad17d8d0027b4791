//! Search tree node representation.
//!
//! Each node owns the game state reached by taking an action from the parent.
//! Nodes store visit statistics used for child selection and policy
//! extraction. Both the rollout search and the guided search share this type.

use engine_core::{terminal_value, Action, GameState};

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// A node in the search tree.
#[derive(Debug, Clone)]
pub struct MctsNode<S> {
    /// Parent node index (NONE for root)
    pub parent: NodeId,

    /// Action that led to this node from parent
    pub action: Action,

    /// Game state at this node, from the perspective of its side to move
    pub state: S,

    /// Number of times this node has been visited
    pub visit_count: u32,

    /// Sum of values backpropagated through this node, from the
    /// perspective of the side to move at this node.
    pub value_sum: f32,

    /// Prior probability of the action leading here.
    /// Only the guided search reads it.
    pub prior: f32,

    /// Whether this is a terminal state (game over)
    pub is_terminal: bool,

    /// Terminal value for the side to move (only valid if is_terminal)
    pub terminal_value: f32,

    /// Children: Vec of (action, NodeId) pairs.
    /// Empty until node is expanded.
    pub children: Vec<(Action, NodeId)>,
}

impl<S: GameState> MctsNode<S> {
    /// Create a new root node.
    pub fn new_root(state: S) -> Self {
        Self::new_child(NodeId::NONE, 0, 1.0, state)
    }

    /// Create a new child node.
    pub fn new_child(parent: NodeId, action: Action, prior: f32, state: S) -> Self {
        let is_terminal = state.is_terminal();
        let terminal_value = if is_terminal {
            terminal_value(&state)
        } else {
            0.0
        };

        Self {
            parent,
            action,
            state,
            visit_count: 0,
            value_sum: 0.0,
            prior,
            is_terminal,
            terminal_value,
            children: Vec::new(),
        }
    }
}

impl<S> MctsNode<S> {
    /// Mean value w/n. Returns 0.0 if never visited.
    #[inline]
    pub fn mean_value(&self) -> f32 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f32
        }
    }

    /// PUCT score of this node seen from its parent:
    /// `-w/n + c_puct * p * sqrt(N) / (1 + n)`.
    ///
    /// The stored value is from this node's side to move, which is the
    /// parent's opponent, so it is negated.
    ///
    /// Takes pre-computed `sqrt(N)` (N = sum of sibling visits) to avoid
    /// redundant sqrt calls when comparing children.
    #[inline]
    pub fn puct_score(&self, sibling_visits_sqrt: f32, c_puct: f32) -> f32 {
        let q = -self.mean_value();
        let u = c_puct * self.prior * sibling_visits_sqrt / (1.0 + self.visit_count as f32);
        q + u
    }

    /// UCB1 score of this node seen from its parent:
    /// `-w/n + sqrt(c * ln(N) / n)`.
    ///
    /// Unvisited nodes score +inf; callers pick them before scoring.
    #[inline]
    pub fn ucb1_score(&self, sibling_visits_ln: f32, exploration: f32) -> f32 {
        if self.visit_count == 0 {
            return f32::INFINITY;
        }
        let n = self.visit_count as f32;
        -self.mean_value() + (exploration * sibling_visits_ln / n).sqrt()
    }

    /// Check if this node has been expanded (has children).
    #[inline]
    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    /// Check if this is a leaf node (not expanded or terminal).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_terminal || !self.is_expanded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_tictactoe::{play_moves, State};

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(!NodeId(0).is_none());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn test_new_root() {
        let node = MctsNode::new_root(State::new());

        assert!(node.parent.is_none());
        assert_eq!(node.visit_count, 0);
        assert!((node.prior - 1.0).abs() < 1e-6);
        assert!(!node.is_terminal);
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_terminal_child() {
        let won = play_moves(&[0, 3, 1, 4, 2]).unwrap();
        let node = MctsNode::new_child(NodeId(0), 2, 0.2, won);

        assert!(node.is_terminal);
        assert!((node.terminal_value - (-1.0)).abs() < 1e-6);
        assert!(node.is_leaf());
    }

    #[test]
    fn test_mean_value() {
        let mut node = MctsNode::new_root(State::new());

        // Unvisited
        assert!((node.mean_value()).abs() < 1e-6);

        // After visits
        node.visit_count = 4;
        node.value_sum = 2.0;
        assert!((node.mean_value() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_puct_score() {
        let mut node = MctsNode::new_root(State::new());
        node.prior = 0.5;
        node.visit_count = 10;
        node.value_sum = 5.0; // Q from child's perspective = 0.5

        // -0.5 + 1.0 * 0.5 * 10 / 11 = -0.5 + 0.4545... ≈ -0.0455
        let score = node.puct_score(100f32.sqrt(), 1.0);
        assert!((score - (-0.0455)).abs() < 0.01);
    }

    #[test]
    fn test_ucb1_score() {
        let mut node = MctsNode::new_root(State::new());
        assert!(node.ucb1_score(1.0, 2.0).is_infinite());

        node.visit_count = 2;
        node.value_sum = -1.0; // -Q = 0.5
        let ln_total = 8f32.ln();
        let expected = 0.5 + (2.0 * ln_total / 2.0).sqrt();
        assert!((node.ucb1_score(ln_total, 2.0) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_is_leaf() {
        let mut node = MctsNode::new_root(State::new());

        // Initially a leaf (no children)
        assert!(node.is_leaf());

        // Add a child
        node.children.push((0, NodeId(1)));
        assert!(!node.is_leaf());
    }
}
