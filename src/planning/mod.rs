//! # Planning
//!
//! Homework 1: solving a known maze.
//! - **Dynamic programming**: value iteration, policy iteration, truncated policy iteration
//! - **Graph search**: BFS and A* shortest paths as a model-free sanity check

pub mod dynamic;
pub mod search;

pub use dynamic::{policy_iteration, truncated_policy_iteration, value_iteration, PlanningConfig, Solution};
pub use search::{astar, bfs};

use crate::grid::{Cell, GridEnv, Policy, Position};
use crate::utils::Reward;

/// Trace of a greedy policy walked from the start
#[derive(Debug, Clone)]
pub struct Rollout {
    /// Visited positions, start included
    pub path: Vec<Position>,
    /// Undiscounted sum of rewards
    pub total_reward: Reward,
    pub reached_goal: bool,
    /// Steps that sent the agent back to the start through a cliff
    pub falls: usize,
}

/// Follow `policy` from the start for at most `max_steps` moves
pub fn follow_policy<E: GridEnv>(env: &E, policy: &Policy, max_steps: usize) -> Rollout {
    let mut pos = env.start();
    let mut rollout = Rollout { path: vec![pos], total_reward: 0.0, reached_goal: false, falls: 0 };
    for _ in 0..max_steps {
        let Some(&action) = policy.get(&pos) else { break };
        let t = env.step(pos, action);
        rollout.total_reward += t.reward;
        let intended = env.layout().offset(pos, action.delta());
        if let Some(cell_pos) = intended {
            if env.layout().get(cell_pos) == Some(Cell::Cliff) && t.next != cell_pos {
                rollout.falls += 1;
            }
        }
        pos = t.next;
        rollout.path.push(pos);
        if t.done {
            rollout.reached_goal = true;
            break;
        }
    }
    rollout
}
