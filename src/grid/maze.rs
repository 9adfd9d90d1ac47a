use super::{Action, Cell, GridEnv, GridRewards, Layout, Position, Transition};

/// Deterministic maze: walls and the grid edge block movement, the goal is absorbing.
/// Cliff cells are plain floor here; see [`super::CliffWalkEnv`] for the dangerous version.
#[derive(Debug, Clone)]
pub struct MazeEnv {
    layout: Layout,
    rewards: GridRewards,
}

impl MazeEnv {
    pub fn new(layout: Layout, rewards: GridRewards) -> Self {
        Self { layout, rewards }
    }

    pub fn rewards(&self) -> &GridRewards {
        &self.rewards
    }
}

impl GridEnv for MazeEnv {
    fn layout(&self) -> &Layout {
        &self.layout
    }

    fn step(&self, pos: Position, action: Action) -> Transition {
        let goal = self.layout.goal();
        if pos == goal {
            return Transition { next: goal, reward: 0.0, done: true };
        }
        match self.layout.offset(pos, action.delta()) {
            Some(next) if self.layout.get(next) != Some(Cell::Wall) => {
                if next == goal {
                    Transition { next, reward: self.rewards.goal, done: true }
                } else {
                    Transition { next, reward: self.rewards.step, done: false }
                }
            }
            // Off the grid or into a wall: stay put
            _ => Transition { next: pos, reward: self.rewards.wall, done: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maze() -> MazeEnv {
        MazeEnv::new(Layout::preset("maze1").unwrap(), GridRewards::maze())
    }

    #[test]
    fn ordinary_move_costs_a_step() {
        let t = maze().step((0, 0), Action::E);
        assert_eq!(t, Transition { next: (0, 1), reward: -1.0, done: false });
    }

    #[test]
    fn walls_and_edges_block() {
        let env = maze();
        assert_eq!(env.step((0, 0), Action::S).next, (0, 0));
        assert_eq!(env.step((0, 0), Action::N).next, (0, 0));
        assert_eq!(env.step((0, 0), Action::W).reward, -1.0);
        assert_eq!(env.step((0, 1), Action::E).next, (0, 1));
    }

    #[test]
    fn reaching_the_goal_ends_the_episode() {
        let t = maze().step((3, 4), Action::S);
        assert_eq!(t, Transition { next: (4, 4), reward: 10.0, done: true });
    }

    #[test]
    fn goal_is_absorbing() {
        let env = maze();
        for action in Action::ALL {
            let t = env.step((4, 4), action);
            assert_eq!(t, Transition { next: (4, 4), reward: 0.0, done: true });
        }
    }

    #[test]
    fn cliff_cells_are_floor_in_a_plain_maze() {
        let env = MazeEnv::new(Layout::preset("cliffwalk3").unwrap(), GridRewards::maze());
        let t = env.step((3, 0), Action::E);
        assert_eq!(t.next, (3, 1));
        assert!(!t.done);
    }
}
