use std::collections::HashMap;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::grid::{Action, GridEnv, Policy, Position, ValueTable};
use crate::utils::{first_argmax, Reward};

/// Tabular action values. Rows appear the first time a state is touched and start at zero.
#[derive(Debug, Clone, Default)]
pub struct QTable {
    rows: HashMap<Position, [Reward; Action::COUNT]>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row of a state, created on first access
    pub fn row_mut(&mut self, state: Position) -> &mut [Reward; Action::COUNT] {
        self.rows.entry(state).or_insert([0.0; Action::COUNT])
    }

    /// Row of a state; unseen states read as zeros without being inserted
    pub fn row(&self, state: Position) -> [Reward; Action::COUNT] {
        self.rows.get(&state).copied().unwrap_or([0.0; Action::COUNT])
    }

    #[inline]
    pub fn get(&self, state: Position, action: Action) -> Reward {
        self.row(state)[action.index()]
    }

    #[inline]
    pub fn set(&mut self, state: Position, action: Action, value: Reward) {
        self.row_mut(state)[action.index()] = value;
    }

    /// Move Q(s, a) a step of size `alpha` toward `target`
    pub fn update(&mut self, state: Position, action: Action, target: Reward, alpha: f64) {
        let q = &mut self.row_mut(state)[action.index()];
        *q += alpha * (target - *q);
    }

    pub fn max_value(&self, state: Position) -> Reward {
        self.row(state).into_iter().fold(f64::NEG_INFINITY, f64::max)
    }

    /// First maximising action in N, S, W, E order
    pub fn greedy_action(&self, state: Position) -> Action {
        let row = self.row(state);
        Action::ALL[first_argmax(&row).unwrap_or(0)]
    }

    /// Explore with probability `epsilon`, otherwise pick uniformly among the best actions
    pub fn choose_action_epsilon_greedy<R: Rng + ?Sized>(
        &mut self,
        state: Position,
        epsilon: f64,
        rng: &mut R,
    ) -> Action {
        let row = *self.row_mut(state);
        if rng.random::<f64>() < epsilon {
            return *Action::ALL.choose(rng).unwrap_or(&Action::N);
        }
        let best = row.into_iter().fold(f64::NEG_INFINITY, f64::max);
        let ties: Vec<Action> = Action::ALL.into_iter().filter(|a| row[a.index()] == best).collect();
        *ties.choose(rng).unwrap_or(&Action::N)
    }

    /// Probability of each action under the epsilon-greedy policy, mass `1 - epsilon`
    /// going to the first greedy action
    pub fn epsilon_greedy_probs(&self, state: Position, epsilon: f64) -> [f64; Action::COUNT] {
        let mut probs = [epsilon / Action::COUNT as f64; Action::COUNT];
        probs[self.greedy_action(state).index()] += 1.0 - epsilon;
        probs
    }

    /// Greedy action of every visited non-terminal state
    pub fn greedy_policy<E: GridEnv>(&self, env: &E) -> Policy {
        self.rows
            .keys()
            .filter(|&&s| !env.is_terminal(s))
            .map(|&s| (s, self.greedy_action(s)))
            .collect()
    }

    /// Visited states, in no particular order
    pub fn states(&self) -> impl Iterator<Item = Position> + '_ {
        self.rows.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// V(s) = max_a Q(s, a) over the visited states
pub fn q_to_v(q: &QTable) -> ValueTable {
    q.states().map(|s| (s, q.max_value(s))).collect()
}
