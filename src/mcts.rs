//! # Monte Carlo Tree Search
//!
//! PUCT search over any [`Game`], in the AlphaZero style: every node stores a prior `P`,
//! a visit count `N` and a running mean `Q` seen from the player who moved into it.
//! Selection maximises `Q + c_puct * P * sqrt(N_parent) / (1 + N)`, leaves are valued by an
//! [`Evaluator`], and the value is backed up with alternating sign.
//!
//! - [`RolloutEvaluator`]: uniform priors and a random playout (pure MCTS)
//! - [`NetworkEvaluator`](crate::neural::NetworkEvaluator): the policy/value network
//!
//! Nodes live in an arena (`Vec<Node>`) addressed by index.

use log::trace;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_distr::Gamma;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, SearchError};
use crate::utils::{visit_distribution, Action, Game, Probability, Reward};

/// Search hyper-parameters shared by training and play
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaZeroConfig {
    /// Exploration constant of the PUCT formula
    pub c_puct: f64,
    /// Playouts per move
    pub n_playout: usize,
    /// Temperature of the self-play move distribution
    pub temperature: f64,
    pub dirichlet_alpha: f64,
    /// Weight of the Dirichlet noise mixed into self-play move choices
    pub noise_weight: f64,
}

impl Default for AlphaZeroConfig {
    fn default() -> Self {
        Self { c_puct: 5.0, n_playout: 400, temperature: 1.0, dirichlet_alpha: 0.3, noise_weight: 0.25 }
    }
}

// ---------- Evaluators ---------- //
/// Values a non-terminal leaf: priors over the legal actions and the expected outcome
/// for the player to move, in [-1, 1]
pub trait Evaluator<G: Game> {
    fn evaluate(&mut self, game: &G) -> Result<(Vec<(Action, Probability)>, Reward), SearchError>;
}

/// Uniform priors; the value comes from one random playout
#[derive(Debug, Clone)]
pub struct RolloutEvaluator {
    rng: StdRng,
    limit: usize,
}

impl RolloutEvaluator {
    pub const DEFAULT_LIMIT: usize = 1000;

    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), limit: Self::DEFAULT_LIMIT }
    }

    /// +1 if the player to move in `game` wins the random playout, -1 if they lose,
    /// 0 for a draw or when the move limit is hit
    fn rollout<G: Game>(&mut self, game: &G) -> Result<Reward, SearchError> {
        let me = game.active_player();
        let mut state = game.clone();
        for _ in 0..self.limit {
            if state.is_over() {
                return Ok(match state.winner() {
                    None => 0.0,
                    Some(w) if w == me => 1.0,
                    Some(_) => -1.0,
                });
            }
            let actions = state.available_actions();
            let &action = actions.choose(&mut self.rng).ok_or(GameError::NoMoves)?;
            state.apply(action)?;
        }
        trace!("rollout hit the move limit of {}", self.limit);
        Ok(0.0)
    }
}

impl<G: Game> Evaluator<G> for RolloutEvaluator {
    fn evaluate(&mut self, game: &G) -> Result<(Vec<(Action, Probability)>, Reward), SearchError> {
        let actions = game.available_actions();
        let p = 1.0 / actions.len().max(1) as f64;
        let priors = actions.into_iter().map(|a| (a, p)).collect();
        Ok((priors, self.rollout(game)?))
    }
}

// ---------- Tree ---------- //
#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    children: Vec<(Action, usize)>,
    visits: u32,
    /// Mean value for the player who moved into this node
    q: Reward,
    prior: Probability,
}

impl Node {
    fn new(parent: Option<usize>, prior: Probability) -> Self {
        Self { parent, children: vec![], visits: 0, q: 0.0, prior }
    }
}

#[derive(Debug, Clone)]
pub struct Mcts {
    nodes: Vec<Node>,
    root: usize,
    c_puct: f64,
    n_playout: usize,
}

impl Mcts {
    pub fn new(c_puct: f64, n_playout: usize) -> Self {
        Self { nodes: vec![Node::new(None, 1.0)], root: 0, c_puct, n_playout }
    }

    pub fn n_playout(&self) -> usize {
        self.n_playout
    }

    /// Nodes currently held by the arena
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_visits(&self) -> u32 {
        self.nodes[self.root].visits
    }

    fn puct(&self, parent_visits: u32, node: &Node) -> Reward {
        node.q + self.c_puct * node.prior * (parent_visits as f64).sqrt() / (1.0 + node.visits as f64)
    }

    /// Child with the highest PUCT score, the first one on ties
    fn select(&self, idx: usize) -> Option<(Action, usize)> {
        let parent_visits = self.nodes[idx].visits;
        let mut best: Option<((Action, usize), Reward)> = None;
        for &(action, child) in &self.nodes[idx].children {
            let score = self.puct(parent_visits, &self.nodes[child]);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some(((action, child), score));
            }
        }
        best.map(|(c, _)| c)
    }

    fn expand(&mut self, idx: usize, priors: &[(Action, Probability)]) {
        for &(action, prior) in priors {
            let child = self.nodes.len();
            self.nodes.push(Node::new(Some(idx), prior));
            self.nodes[idx].children.push((action, child));
        }
    }

    /// Running-mean update from `idx` up to the root, flipping the sign every level
    fn backup(&mut self, idx: usize, value: Reward) {
        let mut cur = Some(idx);
        let mut v = value;
        while let Some(i) = cur {
            let node = &mut self.nodes[i];
            node.visits += 1;
            node.q += (v - node.q) / node.visits as f64;
            v = -v;
            cur = if i == self.root { None } else { node.parent };
        }
    }

    /// One playout: descend to a leaf, value it, back the value up
    fn playout<G: Game, E: Evaluator<G>>(&mut self, mut state: G, evaluator: &mut E) -> Result<(), SearchError> {
        let mut idx = self.root;
        while let Some((action, child)) = self.select(idx) {
            state.apply(action)?;
            idx = child;
        }
        let leaf_value = if state.is_over() {
            match state.winner() {
                None => 0.0,
                Some(w) if w == state.active_player() => 1.0,
                Some(_) => -1.0,
            }
        } else {
            let (priors, value) = evaluator.evaluate(&state)?;
            self.expand(idx, &priors);
            value
        };
        // the leaf stores the value for the player who moved into it
        self.backup(idx, -leaf_value);
        Ok(())
    }

    /// Run every playout from `game`, which must match the current root
    pub fn search<G: Game, E: Evaluator<G>>(&mut self, game: &G, evaluator: &mut E) -> Result<(), SearchError> {
        if game.is_over() {
            return Err(GameError::GameOver.into());
        }
        for _ in 0..self.n_playout {
            self.playout(game.clone(), evaluator)?;
        }
        trace!("search done, {} nodes, root visits {}", self.nodes.len(), self.root_visits());
        Ok(())
    }

    /// Root actions with their visit counts
    pub fn root_visit_counts(&self) -> Vec<(Action, u32)> {
        self.nodes[self.root].children.iter().map(|&(a, c)| (a, self.nodes[c].visits)).collect()
    }

    /// softmax(log(N + 1e-10) / temperature) over the root's children
    pub fn move_probs(&self, temperature: f64) -> Vec<(Action, Probability)> {
        let counts = self.root_visit_counts();
        let visits: Vec<u32> = counts.iter().map(|&(_, n)| n).collect();
        let probs = visit_distribution(&visits, temperature);
        counts.into_iter().map(|(a, _)| a).zip(probs).collect()
    }

    /// Most visited root action, the first one on ties
    pub fn best_action(&self) -> Option<Action> {
        let mut best: Option<(Action, u32)> = None;
        for (a, n) in self.root_visit_counts() {
            if best.is_none_or(|(_, b)| n > b) {
                best = Some((a, n));
            }
        }
        best.map(|(a, _)| a)
    }

    /// Move the root to the child reached by `action`, keeping its subtree.
    /// Unknown actions discard the tree.
    pub fn advance(&mut self, action: Action) {
        let child = self.nodes[self.root].children.iter().find(|&&(a, _)| a == action).map(|&(_, c)| c);
        let Some(child) = child else {
            self.reset();
            return;
        };
        // copy the kept subtree into a fresh arena so the rest can be dropped
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<(usize, Option<usize>, Action)> = vec![(child, None, action)];
        while let Some((old, parent, via)) = stack.pop() {
            let new = nodes.len();
            let mut node = self.nodes[old].clone();
            node.parent = parent;
            let kids = std::mem::take(&mut node.children);
            nodes.push(node);
            if let Some(p) = parent {
                nodes[p].children.push((via, new));
            }
            for &(a, k) in kids.iter().rev() {
                stack.push((k, Some(new), a));
            }
        }
        self.nodes = nodes;
        self.root = 0;
    }

    /// Throw the whole tree away
    pub fn reset(&mut self) {
        self.nodes = vec![Node::new(None, 1.0)];
        self.root = 0;
    }
}

// ---------- Players ---------- //
/// Anything that can pick a move in a game
pub trait Agent<G: Game> {
    fn name(&self) -> String;
    /// Forget any state carried between moves (called at the start of each game)
    fn reset(&mut self);
    fn choose_action(&mut self, game: &G) -> Result<Action, SearchError>;
}

/// MCTS-driven player. In self-play mode the tree is reused across moves and moves are
/// sampled with Dirichlet noise; otherwise the most visited move is played and the tree reset.
pub struct MctsPlayer<E> {
    mcts: Mcts,
    evaluator: E,
    self_play: bool,
    config: AlphaZeroConfig,
    rng: StdRng,
}

impl<E> MctsPlayer<E> {
    pub fn new(evaluator: E, config: AlphaZeroConfig, self_play: bool, seed: u64) -> Self {
        Self {
            mcts: Mcts::new(config.c_puct, config.n_playout),
            evaluator,
            self_play,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Dirichlet(alpha, ..., alpha) sample from normalised Gamma(alpha, 1) draws
    fn dirichlet(&mut self, n: usize) -> Vec<Probability> {
        let Ok(gamma) = Gamma::new(self.config.dirichlet_alpha, 1.0) else {
            return vec![1.0 / n as f64; n];
        };
        let samples: Vec<f64> = (0..n).map(|_| gamma.sample(&mut self.rng)).collect();
        let sum: f64 = samples.iter().sum();
        if sum > 0.0 {
            samples.into_iter().map(|s| s / sum).collect()
        } else {
            vec![1.0 / n as f64; n]
        }
    }

    fn sample(&mut self, weights: &[Probability]) -> usize {
        match WeightedIndex::new(weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => self.rng.random_range(0..weights.len()),
        }
    }

    /// Search `game` and pick a move. Also returns the search distribution over the full
    /// action space (zero for illegal moves).
    pub fn choose_with_probs<G: Game>(&mut self, game: &G, temperature: f64) -> Result<(Action, Vec<Probability>), SearchError>
    where
        E: Evaluator<G>,
    {
        self.mcts.search(game, &mut self.evaluator)?;
        let acts_probs = self.mcts.move_probs(temperature);
        if acts_probs.is_empty() {
            return Err(GameError::NoMoves.into());
        }
        let mut full = vec![0.0; game.action_space()];
        for &(a, p) in &acts_probs {
            full[a] = p;
        }

        let action = if self.self_play {
            let noise = self.dirichlet(acts_probs.len());
            let w = self.config.noise_weight;
            let mixed: Vec<Probability> =
                acts_probs.iter().zip(&noise).map(|(&(_, p), &n)| (1.0 - w) * p + w * n).collect();
            let action = acts_probs[self.sample(&mixed)].0;
            self.mcts.advance(action);
            action
        } else {
            let action = self.mcts.best_action().ok_or(GameError::NoMoves)?;
            self.mcts.reset();
            action
        };
        Ok((action, full))
    }
}

impl<G: Game, E: Evaluator<G>> Agent<G> for MctsPlayer<E> {
    fn name(&self) -> String {
        format!("MCTS({} playouts)", self.mcts.n_playout())
    }

    fn reset(&mut self) {
        self.mcts.reset();
    }

    fn choose_action(&mut self, game: &G) -> Result<Action, SearchError> {
        let temperature = self.config.temperature;
        self.choose_with_probs(game, temperature).map(|(a, _)| a)
    }
}

/// Pure MCTS: uniform priors and random rollouts
pub fn pure_mcts_player(c_puct: f64, n_playout: usize, seed: u64) -> MctsPlayer<RolloutEvaluator> {
    let config = AlphaZeroConfig { c_puct, n_playout, ..Default::default() };
    MctsPlayer::new(RolloutEvaluator::new(seed), config, false, seed.wrapping_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::Gomoku;

    /// Board with the given stones; `p1` and `p2` alternate starting with `p1`
    fn position(width: usize, n: usize, p1: &[usize], p2: &[usize]) -> Gomoku {
        let mut g = Gomoku::with_size(width, width, n).unwrap();
        for i in 0..p1.len().max(p2.len()) {
            if let Some(&m) = p1.get(i) {
                g.try_play(m).unwrap();
            }
            if let Some(&m) = p2.get(i) {
                g.try_play(m).unwrap();
            }
        }
        g
    }

    #[test]
    fn finds_an_immediate_win() {
        // X: 0 1 2 on the top row, O: 12 13 14 on the bottom row, X to move
        let g = position(4, 4, &[0, 1, 2], &[12, 13, 14]);
        let mut player = pure_mcts_player(5.0, 400, 3);
        assert_eq!(player.choose_action(&g).unwrap(), 3);
    }

    #[test]
    fn blocks_an_immediate_loss() {
        // X: 0 1 2, O: 12 13, O to move must take 3
        let g = position(4, 4, &[0, 1, 2], &[12, 13]);
        let mut player = pure_mcts_player(5.0, 1000, 7);
        assert_eq!(player.choose_action(&g).unwrap(), 3);
    }

    #[test]
    fn move_probs_sum_to_one() {
        let g = Gomoku::with_size(3, 3, 3).unwrap();
        let mut mcts = Mcts::new(5.0, 200);
        let mut eval = RolloutEvaluator::new(1);
        mcts.search(&g, &mut eval).unwrap();
        let probs = mcts.move_probs(1.0);
        assert_eq!(probs.len(), 9);
        assert!((probs.iter().map(|&(_, p)| p).sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(mcts.root_visits(), 200);
    }

    #[test]
    fn searching_a_finished_game_fails() {
        let g = position(3, 1, &[4], &[]);
        let mut mcts = Mcts::new(5.0, 10);
        let err = mcts.search(&g, &mut RolloutEvaluator::new(0)).unwrap_err();
        assert!(matches!(err, SearchError::Game(GameError::GameOver)));
    }

    #[test]
    fn advance_keeps_the_subtree() {
        let g = Gomoku::with_size(3, 3, 3).unwrap();
        let mut mcts = Mcts::new(5.0, 300);
        let mut eval = RolloutEvaluator::new(2);
        mcts.search(&g, &mut eval).unwrap();
        let (action, visits) = mcts.root_visit_counts()[4];
        mcts.advance(action);
        assert_eq!(mcts.root_visits(), visits);
        assert_eq!(mcts.root_visit_counts().len(), 8);
        let kept: u32 = mcts.root_visit_counts().iter().map(|&(_, n)| n).sum();
        // every visit through the new root but its own expansion reached a child
        assert_eq!(kept + 1, visits);

        mcts.advance(999);
        assert_eq!(mcts.size(), 1);
    }

    #[test]
    fn self_play_returns_a_full_distribution() {
        let g = Gomoku::with_size(3, 3, 3).unwrap();
        let config = AlphaZeroConfig { n_playout: 50, ..Default::default() };
        let mut player = MctsPlayer::new(RolloutEvaluator::new(4), config, true, 4);
        let (action, probs) = player.choose_with_probs(&g, 1.0).unwrap();
        assert_eq!(probs.len(), 9);
        assert!(probs[action] > 0.0);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
