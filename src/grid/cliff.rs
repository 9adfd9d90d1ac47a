use super::{Action, Cell, GridEnv, GridRewards, Layout, MazeEnv, Position, Transition};

/// Sutton & Barto's cliff walk: a maze whose cliff cells send the agent back to the start
#[derive(Debug, Clone)]
pub struct CliffWalkEnv {
    maze: MazeEnv,
}

impl CliffWalkEnv {
    pub fn new(layout: Layout, rewards: GridRewards) -> Self {
        Self { maze: MazeEnv::new(layout, rewards) }
    }

    pub fn rewards(&self) -> &GridRewards {
        self.maze.rewards()
    }

    pub fn is_cliff(&self, pos: Position) -> bool {
        self.layout().get(pos) == Some(Cell::Cliff)
    }
}

impl GridEnv for CliffWalkEnv {
    fn layout(&self) -> &Layout {
        self.maze.layout()
    }

    fn step(&self, pos: Position, action: Action) -> Transition {
        if pos == self.goal() {
            return Transition { next: pos, reward: 0.0, done: true };
        }
        match self.layout().offset(pos, action.delta()) {
            Some(next) if self.is_cliff(next) => Transition {
                next: self.start(),
                reward: self.rewards().cliff,
                done: false,
            },
            _ => self.maze.step(pos, action),
        }
    }
}
