//! Shortest start-to-goal paths by plain graph search. Walls and cliffs are impassable.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use crate::grid::{Action, Cell, Layout, Position};

fn passable(layout: &Layout, pos: Position) -> bool {
    !matches!(layout.get(pos), None | Some(Cell::Wall) | Some(Cell::Cliff))
}

fn neighbours(layout: &Layout, pos: Position) -> impl Iterator<Item = Position> + '_ {
    Action::ALL
        .into_iter()
        .filter_map(move |a| layout.offset(pos, a.delta()))
        .filter(move |&p| passable(layout, p))
}

fn rebuild(came_from: &HashMap<Position, Position>, start: Position, goal: Position) -> Vec<Position> {
    let mut path = vec![goal];
    let mut cur = goal;
    while cur != start {
        cur = came_from[&cur];
        path.push(cur);
    }
    path.reverse();
    path
}

/// Breadth-first search; the returned path includes both the start and the goal
pub fn bfs(layout: &Layout) -> Option<Vec<Position>> {
    let (start, goal) = (layout.start(), layout.goal());
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut frontier = VecDeque::from([start]);
    while let Some(pos) = frontier.pop_front() {
        if pos == goal {
            return Some(rebuild(&came_from, start, goal));
        }
        for next in neighbours(layout, pos) {
            if next != start && !came_from.contains_key(&next) {
                came_from.insert(next, pos);
                frontier.push_back(next);
            }
        }
    }
    None
}

#[inline]
fn manhattan(a: Position, b: Position) -> usize {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

/// A* with the Manhattan distance heuristic
pub fn astar(layout: &Layout) -> Option<Vec<Position>> {
    let (start, goal) = (layout.start(), layout.goal());
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut cost: HashMap<Position, usize> = HashMap::from([(start, 0)]);
    // (f, g, position); the position breaks ties deterministically
    let mut open = BinaryHeap::from([Reverse((manhattan(start, goal), 0usize, start))]);

    while let Some(Reverse((_, g, pos))) = open.pop() {
        if pos == goal {
            return Some(rebuild(&came_from, start, goal));
        }
        if g > cost[&pos] {
            continue; // stale entry
        }
        for next in neighbours(layout, pos) {
            let tentative = g + 1;
            if cost.get(&next).is_none_or(|&c| tentative < c) {
                cost.insert(next, tentative);
                came_from.insert(next, pos);
                open.push(Reverse((tentative + manhattan(next, goal), tentative, next)));
            }
        }
    }
    None
}
