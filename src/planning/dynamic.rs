//! Dynamic programming on a known grid MDP: value iteration, policy iteration and
//! truncated policy iteration.

use log::{debug, info};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PlanningError;
use crate::grid::{Action, GridEnv, Policy, Position, ValueTable};
use crate::utils::{first_argmax, Reward};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Discount factor
    pub gamma: f64,
    /// Convergence threshold on the largest value change of a sweep
    pub theta: f64,
    /// Evaluation sweeps per iteration of truncated policy iteration
    pub truncation: usize,
    /// Upper bound on outer iterations and on evaluation sweeps
    pub max_iterations: usize,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self { gamma: 0.9, theta: 1e-6, truncation: 5, max_iterations: 10_000 }
    }
}

/// Result of a DP solver
#[derive(Debug, Clone)]
pub struct Solution {
    pub values: ValueTable,
    pub policy: Policy,
    /// Full value table after every iteration, starting from the initial zeros
    pub history: Vec<ValueTable>,
    pub iterations: usize,
}

impl Solution {
    /// Value of one state across the history (used for convergence curves)
    pub fn value_curve(&self, pos: Position) -> Vec<Reward> {
        self.history.iter().map(|v| v.get(&pos).copied().unwrap_or(0.0)).collect()
    }
}

fn zero_values<E: GridEnv>(env: &E) -> ValueTable {
    env.states().into_iter().map(|s| (s, 0.0)).collect()
}

/// One-step lookahead: r + gamma * V(s') for every action, in action order
fn action_values<E: GridEnv>(env: &E, values: &ValueTable, state: Position, gamma: f64) -> [Reward; 4] {
    let mut q = [0.0; 4];
    for action in Action::ALL {
        let t = env.step(state, action);
        q[action.index()] = t.reward + gamma * values.get(&t.next).copied().unwrap_or(0.0);
    }
    q
}

fn greedy<E: GridEnv>(env: &E, values: &ValueTable, state: Position, gamma: f64) -> (Action, Reward) {
    let q = action_values(env, values, state, gamma);
    let best = first_argmax(&q).unwrap_or(0);
    (Action::ALL[best], q[best])
}

/// Greedy improvement over all non-terminal states; returns whether no action changed
fn improve<E: GridEnv>(env: &E, values: &ValueTable, policy: &mut Policy, gamma: f64) -> bool {
    let mut stable = true;
    for s in env.states() {
        if env.is_terminal(s) {
            continue;
        }
        let (best, _) = greedy(env, values, s, gamma);
        if policy.insert(s, best) != Some(best) {
            stable = false;
        }
    }
    stable
}

fn random_policy<E: GridEnv, R: Rng + ?Sized>(env: &E, rng: &mut R) -> Policy {
    env.states()
        .into_iter()
        .filter(|&s| !env.is_terminal(s))
        .map(|s| (s, *Action::ALL.choose(rng).unwrap_or(&Action::N)))
        .collect()
}

/// Synchronous value iteration
pub fn value_iteration<E: GridEnv>(env: &E, cfg: &PlanningConfig) -> Result<Solution, PlanningError> {
    let mut values = zero_values(env);
    let mut policy = Policy::new();
    let mut history = vec![values.clone()];

    for iteration in 1..=cfg.max_iterations {
        let old = values.clone();
        let mut delta: f64 = 0.0;
        for s in env.states() {
            // The terminal state keeps value 0 and has no action
            if env.is_terminal(s) {
                continue;
            }
            let (best, v) = greedy(env, &old, s, cfg.gamma);
            policy.insert(s, best);
            delta = delta.max((old[&s] - v).abs());
            values.insert(s, v);
        }
        history.push(values.clone());
        debug!("value iteration sweep {}: delta {:.3e}", iteration, delta);
        if delta < cfg.theta {
            info!("Value iteration converged after {} iterations", iteration);
            return Ok(Solution { values, policy, history, iterations: iteration });
        }
    }
    Err(PlanningError::NotConverged { algorithm: "value iteration", iterations: cfg.max_iterations })
}

/// Iterative policy evaluation, updating values in place until the change drops below theta
fn evaluate_policy<E: GridEnv>(
    env: &E,
    policy: &Policy,
    values: &mut ValueTable,
    cfg: &PlanningConfig,
) -> Result<(), PlanningError> {
    for _ in 0..cfg.max_iterations {
        let mut delta: f64 = 0.0;
        for (&s, &action) in policy {
            let t = env.step(s, action);
            let v = t.reward + cfg.gamma * values.get(&t.next).copied().unwrap_or(0.0);
            delta = delta.max((values[&s] - v).abs());
            values.insert(s, v);
        }
        if delta < cfg.theta {
            return Ok(());
        }
    }
    Err(PlanningError::NotConverged { algorithm: "policy evaluation", iterations: cfg.max_iterations })
}

/// Policy iteration from a random initial policy
pub fn policy_iteration<E: GridEnv, R: Rng + ?Sized>(
    env: &E,
    cfg: &PlanningConfig,
    rng: &mut R,
) -> Result<Solution, PlanningError> {
    let mut policy = random_policy(env, rng);
    let mut values = zero_values(env);
    let mut history = vec![values.clone()];

    for iteration in 1..=cfg.max_iterations {
        evaluate_policy(env, &policy, &mut values, cfg)?;
        history.push(values.clone());
        if improve(env, &values, &mut policy, cfg.gamma) {
            info!("Policy iteration converged after {} iterations", iteration);
            return Ok(Solution { values, policy, history, iterations: iteration });
        }
    }
    Err(PlanningError::NotConverged { algorithm: "policy iteration", iterations: cfg.max_iterations })
}

/// Policy iteration whose evaluation step runs a fixed number of synchronous sweeps
pub fn truncated_policy_iteration<E: GridEnv, R: Rng + ?Sized>(
    env: &E,
    cfg: &PlanningConfig,
    rng: &mut R,
) -> Result<Solution, PlanningError> {
    let mut policy = random_policy(env, rng);
    let mut values = zero_values(env);
    let mut history = vec![values.clone()];

    for iteration in 1..=cfg.max_iterations {
        for _ in 0..cfg.truncation {
            let old = values.clone();
            for (&s, &action) in &policy {
                let t = env.step(s, action);
                values.insert(s, t.reward + cfg.gamma * old.get(&t.next).copied().unwrap_or(0.0));
            }
        }
        history.push(values.clone());
        if improve(env, &values, &mut policy, cfg.gamma) {
            info!("Truncated policy iteration converged after {} iterations", iteration);
            return Ok(Solution { values, policy, history, iterations: iteration });
        }
    }
    Err(PlanningError::NotConverged {
        algorithm: "truncated policy iteration",
        iterations: cfg.max_iterations,
    })
}
