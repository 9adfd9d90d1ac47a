//! # Grid Worlds
//!
//! Deterministic gridworld environments shared by the maze (dynamic programming)
//! and cliff walk (temporal-difference) homeworks:
//! - **Layouts**: cell codes, parsing and the built-in presets
//! - **Maze**: walls block movement, reaching the goal ends the episode
//! - **Cliff walk**: stepping onto a cliff cell costs dearly and restarts the agent

pub mod cliff;
pub mod layout;
pub mod maze;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::utils::Reward;
pub use cliff::CliffWalkEnv;
pub use layout::{Cell, Layout, Position};
pub use maze::MazeEnv;

/// State values keyed by position (row-major iteration order)
pub type ValueTable = BTreeMap<Position, Reward>;
/// Deterministic policy; terminal states carry no action
pub type Policy = BTreeMap<Position, Action>;

/// Compass moves. The declaration order is the tie-break order of every greedy choice.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action { N, S, W, E }

impl Action {
    pub const ALL: [Action; 4] = [Action::N, Action::S, Action::W, Action::E];
    pub const COUNT: usize = 4;

    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::N => (-1, 0),
            Action::S => (1, 0),
            Action::W => (0, -1),
            Action::E => (0, 1),
        }
    }

    #[inline] pub fn index(self) -> usize {
        self as usize
    }

    pub fn arrow(self) -> char {
        match self {
            Action::N => '↑',
            Action::S => '↓',
            Action::W => '←',
            Action::E => '→',
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next: Position,
    pub reward: Reward,
    pub done: bool,
}

/// Reward scheme of a grid world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridRewards {
    /// Any ordinary move
    pub step: Reward,
    /// Entering the goal
    pub goal: Reward,
    /// Bumping into a wall or the edge of the grid (the agent stays put)
    pub wall: Reward,
    /// Falling off a cliff (only used by the cliff walk)
    pub cliff: Reward,
}

impl GridRewards {
    pub fn maze() -> Self {
        Self { step: -1.0, goal: 10.0, wall: -1.0, cliff: -100.0 }
    }

    pub fn cliff_walk() -> Self {
        Self { step: -1.0, goal: 0.0, wall: -1.0, cliff: -100.0 }
    }
}

impl Default for GridRewards {
    fn default() -> Self {
        Self::maze()
    }
}

/// A deterministic grid MDP whose dynamics can be queried from any state
pub trait GridEnv {
    fn layout(&self) -> &Layout;
    fn step(&self, pos: Position, action: Action) -> Transition;

    fn start(&self) -> Position {
        self.layout().start()
    }
    fn goal(&self) -> Position {
        self.layout().goal()
    }
    fn is_terminal(&self, pos: Position) -> bool {
        pos == self.goal()
    }
    /// Every cell the agent can occupy, in row-major order
    fn states(&self) -> Vec<Position> {
        let layout = self.layout();
        layout.positions().filter(|&p| layout.get(p) != Some(Cell::Wall)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_order_is_nswe() {
        let idx: Vec<usize> = Action::ALL.iter().map(|a| a.index()).collect();
        assert_eq!(idx, vec![0, 1, 2, 3]);
        assert_eq!(Action::W.delta(), (0, -1));
    }

    #[test]
    fn states_skip_walls() {
        let env = MazeEnv::new(Layout::preset("maze1").unwrap(), GridRewards::maze());
        let states = env.states();
        assert!(!states.contains(&(0, 2)));
        assert!(states.contains(&(0, 0)));
        assert_eq!(states.len(), 25 - 8);
    }
}
