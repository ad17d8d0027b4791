//! Search tree with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by NodeId indices.
//! A tree lives for exactly one search call.

use engine_core::{Action, GameState};

use crate::node::{MctsNode, NodeId};

/// Index of the first maximum in `scores`. Later equal scores never win.
pub(crate) fn first_argmax<I>(scores: I) -> Option<usize>
where
    I: IntoIterator<Item = f32>,
{
    let mut best: Option<(usize, f32)> = None;
    for (idx, score) in scores.into_iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Search tree with arena-based node storage.
#[derive(Debug)]
pub struct MctsTree<S> {
    /// Arena storing all nodes
    nodes: Vec<MctsNode<S>>,

    /// Root node index (always 0 after initialization)
    root: NodeId,
}

impl<S: GameState> MctsTree<S> {
    /// Create a new tree rooted at `root_state`.
    pub fn new(root_state: S) -> Self {
        Self {
            nodes: vec![MctsNode::new_root(root_state)],
            root: NodeId(0),
        }
    }

    /// Add a child to a parent node.
    /// Returns the new child's NodeId.
    pub fn add_child(&mut self, parent_id: NodeId, action: Action, prior: f32, state: S) -> NodeId {
        let child = MctsNode::new_child(parent_id, action, prior, state);
        let child_id = self.allocate(child);

        self.get_mut(parent_id).children.push((action, child_id));

        child_id
    }
}

impl<S> MctsTree<S> {
    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &MctsNode<S> {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode<S> {
        &mut self.nodes[id.0 as usize]
    }

    /// Allocate a new node and return its ID.
    pub fn allocate(&mut self, node: MctsNode<S>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sum of visit counts over the children of `node_id`.
    fn children_visits(&self, node_id: NodeId) -> u32 {
        self.get(node_id)
            .children
            .iter()
            .map(|(_, id)| self.get(*id).visit_count)
            .sum()
    }

    /// First child that has never been visited, if any.
    fn first_unvisited(&self, node_id: NodeId) -> Option<NodeId> {
        self.get(node_id)
            .children
            .iter()
            .map(|(_, id)| *id)
            .find(|id| self.get(*id).visit_count == 0)
    }

    /// Select a child with the PUCT rule.
    ///
    /// Unvisited children are taken first, in child order. Otherwise the
    /// first child with the maximal score wins.
    pub fn select_child_puct(&self, node_id: NodeId, c_puct: f32) -> Option<NodeId> {
        if let Some(id) = self.first_unvisited(node_id) {
            return Some(id);
        }

        let node = self.get(node_id);
        // Pre-compute sqrt once instead of per-child comparison
        let visits_sqrt = (self.children_visits(node_id) as f32).sqrt();

        first_argmax(
            node.children
                .iter()
                .map(|(_, id)| self.get(*id).puct_score(visits_sqrt, c_puct)),
        )
        .map(|idx| node.children[idx].1)
    }

    /// Select a child with the UCB1 rule, unvisited children first.
    pub fn select_child_ucb1(&self, node_id: NodeId, exploration: f32) -> Option<NodeId> {
        if let Some(id) = self.first_unvisited(node_id) {
            return Some(id);
        }

        let node = self.get(node_id);
        let visits_ln = (self.children_visits(node_id) as f32).ln();

        first_argmax(
            node.children
                .iter()
                .map(|(_, id)| self.get(*id).ucb1_score(visits_ln, exploration)),
        )
        .map(|idx| node.children[idx].1)
    }

    /// Backpropagate a value from a leaf to the root.
    /// Value is negated at each level (opponent's perspective).
    pub fn backpropagate(&mut self, leaf_id: NodeId, value: f32) {
        let mut current_id = leaf_id;
        let mut current_value = value;

        while current_id.is_some() {
            let node = self.get_mut(current_id);
            node.visit_count += 1;
            node.value_sum += current_value;

            // Negate for opponent's perspective
            current_value = -current_value;

            current_id = node.parent;
        }
    }

    /// Visit counts of the root's children, in child order.
    pub fn root_visits(&self) -> Vec<(Action, u32)> {
        self.get(self.root)
            .children
            .iter()
            .map(|(action, id)| (*action, self.get(*id).visit_count))
            .collect()
    }

    /// Get the best action from root based on visit counts.
    /// Ties go to the first child. Returns None if root has no children.
    pub fn best_action(&self) -> Option<(Action, u32)> {
        let visits = self.root_visits();
        first_argmax(visits.iter().map(|(_, n)| *n as f32)).map(|idx| visits[idx])
    }

    /// Policy over the full action space derived from root visit counts.
    ///
    /// `temperature == 0` puts all mass on the most visited child. Otherwise
    /// each child gets `n^(1/T)`, normalised. If no child has been visited
    /// the policy is uniform over the root's children.
    pub fn root_policy(&self, num_actions: usize, temperature: f32) -> Vec<f32> {
        let mut policy = vec![0.0; num_actions];
        let visits = self.root_visits();

        if visits.is_empty() {
            return policy;
        }

        let max_visits = visits.iter().map(|(_, n)| *n).max().unwrap_or(0);
        if max_visits == 0 {
            let prob = 1.0 / visits.len() as f32;
            for (action, _) in &visits {
                policy[*action as usize] = prob;
            }
            return policy;
        }

        if temperature < 1e-6 {
            // Greedy: all mass on best action
            if let Some((action, _)) = self.best_action() {
                policy[action as usize] = 1.0;
            }
            return policy;
        }

        // Scale by the largest count first so n^(1/T) cannot overflow
        let inv_t = 1.0 / temperature as f64;
        let weights: Vec<f64> = visits
            .iter()
            .map(|(_, n)| (*n as f64 / max_visits as f64).powf(inv_t))
            .collect();
        let total: f64 = weights.iter().sum();

        for ((action, _), w) in visits.iter().zip(weights) {
            policy[*action as usize] = (w / total) as f32;
        }

        policy
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visit_count,
            root_value: root.mean_value(),
            max_depth: self.compute_max_depth(self.root, 0),
        }
    }

    fn compute_max_depth(&self, node_id: NodeId, current_depth: u32) -> u32 {
        let node = self.get(node_id);
        if node.children.is_empty() {
            return current_depth;
        }

        node.children
            .iter()
            .map(|(_, id)| self.compute_max_depth(*id, current_depth + 1))
            .max()
            .unwrap_or(current_depth)
    }
}

/// Statistics about a search tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f32,
    pub max_depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_tictactoe::State;

    fn root_with_children(priors: &[f32]) -> (MctsTree<State>, Vec<NodeId>) {
        let mut tree = MctsTree::new(State::new());
        let root = tree.root();
        let ids = priors
            .iter()
            .enumerate()
            .map(|(a, &p)| {
                let child = State::new().next(a as u8).unwrap();
                tree.add_child(root, a as u8, p, child)
            })
            .collect();
        (tree, ids)
    }

    #[test]
    fn test_new_tree() {
        let tree = MctsTree::new(State::new());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), NodeId(0));
        assert!(tree.get(tree.root()).parent.is_none());
    }

    #[test]
    fn test_add_child() {
        let (tree, ids) = root_with_children(&[0.5]);

        assert_eq!(tree.len(), 2);
        assert_eq!(ids[0], NodeId(1));

        let root = tree.get(tree.root());
        assert_eq!(root.children, vec![(0, NodeId(1))]);

        let child = tree.get(ids[0]);
        assert_eq!(child.parent, tree.root());
        assert_eq!(child.action, 0);
        assert!((child.prior - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_backpropagate() {
        let (mut tree, ids) = root_with_children(&[1.0]);
        let grandchild_state = tree.get(ids[0]).state.next(4).unwrap();
        let grandchild = tree.add_child(ids[0], 4, 1.0, grandchild_state);

        tree.backpropagate(grandchild, 1.0);

        // Check visits
        assert_eq!(tree.get(grandchild).visit_count, 1);
        assert_eq!(tree.get(ids[0]).visit_count, 1);
        assert_eq!(tree.get(tree.root()).visit_count, 1);

        // Check values (negated at each level)
        assert!((tree.get(grandchild).value_sum - 1.0).abs() < 1e-6);
        assert!((tree.get(ids[0]).value_sum - (-1.0)).abs() < 1e-6);
        assert!((tree.get(tree.root()).value_sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_puct_selects_unvisited_first() {
        let (mut tree, ids) = root_with_children(&[0.1, 0.2, 0.7]);

        // A strong visited child does not beat an unvisited one
        tree.get_mut(ids[2]).visit_count = 5;
        tree.get_mut(ids[2]).value_sum = -5.0;

        assert_eq!(tree.select_child_puct(tree.root(), 1.0), Some(ids[0]));

        tree.get_mut(ids[0]).visit_count = 1;
        assert_eq!(tree.select_child_puct(tree.root(), 1.0), Some(ids[1]));
    }

    #[test]
    fn test_puct_prefers_prior_when_equal() {
        let (mut tree, ids) = root_with_children(&[0.3, 0.7]);
        for id in &ids {
            tree.get_mut(*id).visit_count = 1;
        }

        assert_eq!(tree.select_child_puct(tree.root(), 1.0), Some(ids[1]));
    }

    #[test]
    fn test_ties_break_to_first_child() {
        let (mut tree, ids) = root_with_children(&[0.5, 0.5]);
        for id in &ids {
            tree.get_mut(*id).visit_count = 3;
        }

        assert_eq!(tree.select_child_puct(tree.root(), 1.0), Some(ids[0]));
        assert_eq!(tree.select_child_ucb1(tree.root(), 2.0), Some(ids[0]));
        assert_eq!(tree.best_action(), Some((0, 3)));
    }

    #[test]
    fn test_ucb1_prefers_good_child() {
        let (mut tree, ids) = root_with_children(&[0.0, 0.0]);
        // Child values are from the child's side to move: -1 means the
        // parent's move there wins.
        tree.get_mut(ids[0]).visit_count = 4;
        tree.get_mut(ids[0]).value_sum = 4.0;
        tree.get_mut(ids[1]).visit_count = 4;
        tree.get_mut(ids[1]).value_sum = -4.0;

        assert_eq!(tree.select_child_ucb1(tree.root(), 2.0), Some(ids[1]));
    }

    #[test]
    fn test_root_policy() {
        let (mut tree, ids) = root_with_children(&[0.5, 0.5]);
        tree.get_mut(ids[0]).visit_count = 30;
        tree.get_mut(ids[1]).visit_count = 70;

        // Temperature 1.0: proportional to visits
        let policy = tree.root_policy(9, 1.0);
        assert!((policy[0] - 0.3).abs() < 1e-6);
        assert!((policy[1] - 0.7).abs() < 1e-6);
        for p in policy.iter().skip(2) {
            assert!(p.abs() < 1e-6);
        }

        // Temperature 0.0: greedy
        let greedy = tree.root_policy(9, 0.0);
        assert!(greedy[0].abs() < 1e-6);
        assert!((greedy[1] - 1.0).abs() < 1e-6);

        // Tiny temperature stays finite and sharpens toward the leader
        let sharp = tree.root_policy(9, 0.01);
        assert!(sharp.iter().all(|p| p.is_finite()));
        assert!(sharp[1] > 0.99);
    }

    #[test]
    fn test_root_policy_unvisited_children_is_uniform() {
        let (tree, _) = root_with_children(&[0.9, 0.1]);
        let policy = tree.root_policy(9, 1.0);
        assert!((policy[0] - 0.5).abs() < 1e-6);
        assert!((policy[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_first_argmax() {
        assert_eq!(first_argmax(vec![1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(first_argmax(Vec::<f32>::new()), None);
    }

    #[test]
    fn test_tree_stats() {
        let (tree, _) = root_with_children(&[0.5]);

        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.max_depth, 1);
    }
}
