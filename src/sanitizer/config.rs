use serde::{Deserialize, Serialize};

use crate::{
    budget::pure_dp_budget::PureDPBudget,
    correlation::{
        cidp::DEFAULT_THETA,
        idfa::{BudgetOptimizer, DEFAULT_BETA, DEFAULT_EPSILON_INIT, DEFAULT_MAX_ITERATIONS},
    },
    error::{Error, Result},
};

pub const DEFAULT_RISK_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MAX_ROUNDS: usize = 1000;

/// Parameters of a sanitize call. Every field can be overridden on its own;
/// missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Trajectories with a risk at or above this value get sanitized.
    #[serde(alias = "p")]
    pub risk_threshold: f64,

    /// Maximum number of sanitization rounds executed.
    #[serde(alias = "max_round")]
    pub max_rounds: usize,

    /// Budget every user starts from in each optimization.
    #[serde(alias = "epsl_init")]
    pub epsilon_init: PureDPBudget,

    /// Budget step of the optimizer.
    pub beta: PureDPBudget,

    /// Discount of weak correlations in the disclosure bound.
    pub theta: f64,

    /// Step cap of each per-user budget search.
    pub max_iterations: usize,

    /// Seed of the noise generator.
    pub seed: u64,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            max_rounds: DEFAULT_MAX_ROUNDS,
            epsilon_init: DEFAULT_EPSILON_INIT,
            beta: DEFAULT_BETA,
            theta: DEFAULT_THETA,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: 0,
        }
    }
}

impl SanitizerConfig {
    pub fn new(risk_threshold: f64, max_rounds: usize) -> Self {
        Self {
            risk_threshold,
            max_rounds,
            ..Self::default()
        }
    }

    pub fn with_epsilon_init(mut self, epsilon_init: PureDPBudget) -> Self {
        self.epsilon_init = epsilon_init;
        self
    }

    pub fn with_beta(mut self, beta: PureDPBudget) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Rejects parameters the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &'static str, value: f64| {
            Err(Error::InvalidParameter { name, value })
        };

        if !(0.0..=1.0).contains(&self.risk_threshold) {
            return invalid("risk_threshold", self.risk_threshold);
        }
        if !(self.theta > 0.0 && self.theta < 1.0) {
            return invalid("theta", self.theta);
        }
        if !(self.epsilon_init.is_finite() && self.epsilon_init > 0.0) {
            return invalid("epsilon_init", self.epsilon_init);
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return invalid("beta", self.beta);
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations", 0.0);
        }
        Ok(())
    }

    pub fn optimizer(&self) -> BudgetOptimizer {
        BudgetOptimizer::new(self.epsilon_init, self.beta, self.theta)
            .with_max_iterations(self.max_iterations)
    }
}
