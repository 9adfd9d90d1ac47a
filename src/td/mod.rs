//! # Temporal-Difference Control
//!
//! Homework 2: tabular, model-free control on the cliff walk. The agent only ever
//! sees sampled transitions from [`GridEnv::step`](crate::grid::GridEnv::step).
//! - **SARSA**: on-policy one-step
//! - **Expected SARSA**: bootstraps on the expectation under the epsilon-greedy policy
//! - **n-step SARSA**: on-policy n-step returns
//! - **Q-learning**: off-policy, bootstraps on the greedy action

pub mod control;
pub mod q_table;

use std::fmt::{Display, Formatter};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::{GridEnv, Policy};
use crate::utils::Reward;
pub use control::{expected_sarsa, n_step_sarsa, q_learning, sarsa};
pub use q_table::{q_to_v, QTable};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TdConfig {
    pub episodes: usize,
    /// Step size
    pub alpha: f64,
    /// Discount factor
    pub gamma: f64,
    /// Exploration rate of the behaviour policy
    pub epsilon: f64,
    /// Lookahead of n-step SARSA
    pub n_steps: usize,
    /// Episodes are cut off after this many steps
    pub max_steps_per_episode: usize,
    /// Window of the moving average used for learning curves
    pub smoothing_window: usize,
    /// Show a progress bar while training
    pub progress: bool,
}

impl Default for TdConfig {
    fn default() -> Self {
        Self {
            episodes: 500,
            alpha: 0.5,
            gamma: 1.0,
            epsilon: 0.1,
            n_steps: 5,
            max_steps_per_episode: 1000,
            smoothing_window: 25,
            progress: true,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TdAlgorithm {
    Sarsa,
    ExpectedSarsa,
    NStepSarsa,
    QLearning,
}

impl TdAlgorithm {
    pub const ALL: [TdAlgorithm; 4] =
        [TdAlgorithm::Sarsa, TdAlgorithm::ExpectedSarsa, TdAlgorithm::NStepSarsa, TdAlgorithm::QLearning];

    pub fn run<E: GridEnv, R: Rng + ?Sized>(self, env: &E, cfg: &TdConfig, rng: &mut R) -> TdOutcome {
        match self {
            TdAlgorithm::Sarsa => sarsa(env, cfg, rng),
            TdAlgorithm::ExpectedSarsa => expected_sarsa(env, cfg, rng),
            TdAlgorithm::NStepSarsa => n_step_sarsa(env, cfg, rng),
            TdAlgorithm::QLearning => q_learning(env, cfg, rng),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TdAlgorithm::Sarsa => "SARSA",
            TdAlgorithm::ExpectedSarsa => "Expected SARSA",
            TdAlgorithm::NStepSarsa => "n-step SARSA",
            TdAlgorithm::QLearning => "Q-learning",
        }
    }
}

impl Display for TdAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a TD run leaves behind
#[derive(Debug, Clone)]
pub struct TdOutcome {
    pub algorithm: TdAlgorithm,
    pub q_table: QTable,
    /// Greedy policy over the visited states
    pub policy: Policy,
    /// Total (undiscounted) reward of every episode
    pub history: Vec<Reward>,
}
