//! Game-tree search for two-player zero-sum games.
//!
//! Every engine in this crate works against the `engine-core`
//! [`GameState`](engine_core::GameState) contract and values positions from
//! the side to move:
//!
//! - [`exact`]: minimax and alpha-beta over the full game tree, plus a
//!   [`Minimax`] searcher with transposition table and depth horizon
//! - [`rollout`]: UCB1 tree search valued by random playouts
//! - [`search`]: PUCT tree search guided by an [`Evaluator`]
//!
//! All three are wrapped as [`ActionSelector`]s so they can be played
//! against each other.
//!
//! # Usage
//!
//! ```rust
//! use games_tictactoe::State;
//! use mcts::{run_mcts, MctsConfig, UniformEvaluator};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let evaluator = UniformEvaluator::new();
//! let config = MctsConfig::for_testing();
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//!
//! let result = run_mcts(&evaluator, config, State::new(), &mut rng).unwrap();
//!
//! println!("Best action: {}", result.action);
//! println!("Policy: {:?}", result.policy);
//! println!("Value: {}", result.value);
//! ```
//!
//! # Configuration
//!
//! [`MctsConfig`] controls the guided search:
//!
//! - `num_simulations`: simulations per search, root expansion included (default: 50)
//! - `c_puct`: exploration constant for PUCT (default: 1.0)
//! - `temperature`: 1.0 = proportional to visits, 0.0 = greedy
//! - `dirichlet_alpha` / `dirichlet_epsilon`: optional root noise (off by default)
//!
//! [`RolloutConfig`] and [`ExactConfig`] configure the other two engines.
//!
//! # Evaluators
//!
//! - [`UniformEvaluator`]: uniform policy over legal moves, value 0
//! - [`TabularEvaluator`]: per-position table trained from self-play examples
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ActionSelector                       │
//! ├──────────────┬──────────────────┬────────────────────────┤
//! │  exact       │  RolloutSearch   │  MctsSearch            │
//! │  (minimax,   │  (UCB1,          │  (PUCT,                │
//! │  alpha-beta) │  random playout) │  Evaluator priors)     │
//! │              ├──────────────────┴────────────────────────┤
//! │              │           MctsTree<S> (arena)             │
//! └──────────────┴───────────────────────────────────────────┘
//! ```

pub mod config;
pub mod evaluator;
pub mod exact;
pub mod node;
pub mod rollout;
pub mod search;
pub mod selector;
pub mod tabular;
pub mod tree;

// Re-export main types
pub use config::{ExactConfig, MctsConfig, RolloutConfig};
pub use evaluator::{
    legal_priors, EvalResult, Evaluator, EvaluatorError, Trainable, UniformEvaluator,
};
pub use exact::{
    alpha_beta, alpha_beta_action, alpha_beta_value, minimax_action, minimax_value, Minimax,
};
pub use node::{MctsNode, NodeId};
pub use rollout::{playout, run_rollout_mcts, RolloutResult, RolloutSearch};
pub use search::{
    dirichlet_noise, run_mcts, sample_action, MctsSearch, SearchError, SearchResult, SearchStats,
};
pub use selector::{
    ActionSelector, AlphaBetaSelector, GuidedMctsSelector, MinimaxSelector, RandomSelector,
    RolloutMctsSelector,
};
pub use tabular::{TableEntry, TabularEvaluator};
pub use tree::{MctsTree, TreeStats};
