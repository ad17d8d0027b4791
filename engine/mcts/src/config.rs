//! Search configuration parameters.

use crate::search::SearchError;

/// Configuration for evaluator-guided (PUCT) tree search.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Number of simulations per search, including the one that expands the root.
    pub num_simulations: u32,

    /// Exploration constant for the PUCT formula.
    /// Higher values lean on the evaluator's priors for longer.
    pub c_puct: f32,

    /// Temperature for action selection after search.
    /// 1.0 = sample proportional to visit counts
    /// 0.0 = always pick most-visited (argmax)
    pub temperature: f32,

    /// Dirichlet noise alpha for root node exploration.
    /// Set to 0.0 to disable noise.
    pub dirichlet_alpha: f32,

    /// Fraction of the root prior replaced by Dirichlet noise.
    pub dirichlet_epsilon: f32,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: 50,
            c_puct: 1.0,
            temperature: 1.0,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.25,
        }
    }
}

impl MctsConfig {
    /// Create config for self-play: low-temperature sampling, optional root noise.
    pub fn for_training() -> Self {
        Self {
            temperature: 0.1,
            ..Self::default()
        }
    }

    /// Create config for evaluation (no noise, greedy selection).
    pub fn for_evaluation() -> Self {
        Self {
            temperature: 0.0,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.0,
            ..Self::default()
        }
    }

    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            num_simulations: 25,
            temperature: 0.0,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.0,
            ..Self::default()
        }
    }

    /// Builder pattern: set number of simulations.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    /// Builder pattern: set c_puct exploration constant.
    pub fn with_c_puct(mut self, c: f32) -> Self {
        self.c_puct = c;
        self
    }

    /// Builder pattern: set temperature.
    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    /// Builder pattern: enable root Dirichlet noise.
    pub fn with_dirichlet(mut self, alpha: f32, epsilon: f32) -> Self {
        self.dirichlet_alpha = alpha;
        self.dirichlet_epsilon = epsilon;
        self
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.num_simulations == 0 {
            return Err(SearchError::InvalidConfig(
                "num_simulations must be at least 1".into(),
            ));
        }
        if !self.c_puct.is_finite() || self.c_puct < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "c_puct must be a non-negative number, got {}",
                self.c_puct
            )));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        if !self.dirichlet_alpha.is_finite() || self.dirichlet_alpha < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "dirichlet_alpha must be a non-negative number, got {}",
                self.dirichlet_alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.dirichlet_epsilon) {
            return Err(SearchError::InvalidConfig(format!(
                "dirichlet_epsilon must be in [0, 1], got {}",
                self.dirichlet_epsilon
            )));
        }
        Ok(())
    }
}

/// Configuration for rollout-based (UCB1) tree search.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutConfig {
    /// Number of simulations per search.
    pub num_simulations: u32,

    /// Visit count at which a leaf gets its children.
    pub expansion_threshold: u32,

    /// The `c` in `sqrt(c * ln(N) / n)`.
    pub exploration: f32,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            num_simulations: 100,
            expansion_threshold: 10,
            exploration: 2.0,
        }
    }
}

impl RolloutConfig {
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    pub fn with_expansion_threshold(mut self, n: u32) -> Self {
        self.expansion_threshold = n;
        self
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.num_simulations == 0 {
            return Err(SearchError::InvalidConfig(
                "num_simulations must be at least 1".into(),
            ));
        }
        if self.expansion_threshold == 0 {
            return Err(SearchError::InvalidConfig(
                "expansion_threshold must be at least 1".into(),
            ));
        }
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "exploration must be a non-negative number, got {}",
                self.exploration
            )));
        }
        Ok(())
    }
}

/// Configuration for exact (minimax) search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExactConfig {
    /// Memoise exact values by position.
    pub transposition_table: bool,

    /// Depth horizon; positions still undecided at the horizon score 0.
    pub max_depth: Option<u32>,
}

impl ExactConfig {
    pub fn with_transposition_table(mut self) -> Self {
        self.transposition_table = true;
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert_eq!(config.num_simulations, 50);
        assert!((config.c_puct - 1.0).abs() < 1e-6);
        assert!(config.dirichlet_alpha.abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_training_config_samples_sharply() {
        let config = MctsConfig::for_training();
        assert!((config.temperature - 0.1).abs() < 1e-6);
        assert_eq!(config.num_simulations, MctsConfig::default().num_simulations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = MctsConfig::default()
            .with_simulations(100)
            .with_temperature(0.5);

        assert_eq!(config.num_simulations, 100);
        assert!((config.temperature - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_evaluation_config() {
        let config = MctsConfig::for_evaluation();
        assert!((config.dirichlet_alpha).abs() < 1e-6);
        assert!((config.temperature).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(MctsConfig::default().with_simulations(0).validate().is_err());
        assert!(MctsConfig::default().with_temperature(-1.0).validate().is_err());
        assert!(MctsConfig::default().with_c_puct(f32::NAN).validate().is_err());
        assert!(MctsConfig::default()
            .with_dirichlet(0.3, 1.5)
            .validate()
            .is_err());

        assert!(RolloutConfig::default().validate().is_ok());
        assert!(RolloutConfig::default()
            .with_expansion_threshold(0)
            .validate()
            .is_err());
        assert!(RolloutConfig::default()
            .with_simulations(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_rollout_defaults() {
        let config = RolloutConfig::default();
        assert_eq!(config.num_simulations, 100);
        assert_eq!(config.expansion_threshold, 10);
        assert!((config.exploration - 2.0).abs() < 1e-6);
    }
}
