//! Self-play data generation and head-to-head evaluation.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::games::gomoku::{Gomoku, PLANES};
use crate::mcts::{Agent, Evaluator, MctsPlayer};
use crate::utils::{Game, Player};

/// One position from a self-play game: the encoded state, the search distribution over
/// every cell and the final result for the player to move
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub planes: Vec<f32>,
    pub probs: Vec<f32>,
    pub z: f32,
}

/// Play one game against itself, returning the winner and the labelled positions
pub fn self_play_game<E: Evaluator<Gomoku>>(
    player: &mut MctsPlayer<E>,
    start: &Gomoku,
    temperature: f64,
) -> Result<(Option<Player>, Vec<TrainingSample>), SearchError> {
    let mut game = start.clone();
    Agent::<Gomoku>::reset(player);
    let mut history: Vec<(Vec<f32>, Vec<f32>, Player)> = Vec::new();

    while !game.is_over() {
        let (action, probs) = player.choose_with_probs(&game, temperature)?;
        history.push((game.encode_planes(), probs.iter().map(|&p| p as f32).collect(), game.active_player()));
        game.try_play(action)?;
    }
    Agent::<Gomoku>::reset(player);

    let winner = game.winner();
    debug!("self-play game over after {} moves, winner {:?}", history.len(), winner);
    let samples = history
        .into_iter()
        .map(|(planes, probs, to_move)| {
            let z = match winner {
                None => 0.0,
                Some(w) if w == to_move => 1.0,
                Some(_) => -1.0,
            };
            TrainingSample { planes, probs, z }
        })
        .collect();
    Ok((winner, samples))
}

/// Where cell (r, c) of an n x n board lands after `quarter_turns` clockwise rotations,
/// optionally followed by a left-right mirror
fn transform(n: usize, quarter_turns: usize, mirror: bool, (mut r, mut c): (usize, usize)) -> (usize, usize) {
    for _ in 0..quarter_turns {
        (r, c) = (c, n - 1 - r);
    }
    if mirror {
        c = n - 1 - c;
    }
    (r, c)
}

/// The 8 rotations and reflections of every sample on a square board.
/// Rectangular boards only have their samples copied through.
pub fn augment(samples: &[TrainingSample], width: usize, height: usize) -> Vec<TrainingSample> {
    if width != height {
        return samples.to_vec();
    }
    let n = width;
    let area = n * n;
    let mut out = Vec::with_capacity(samples.len() * 8);
    for sample in samples {
        for quarter_turns in 0..4 {
            for mirror in [false, true] {
                let mut planes = vec![0.0; sample.planes.len()];
                let mut probs = vec![0.0; sample.probs.len()];
                for r in 0..n {
                    for c in 0..n {
                        let (tr, tc) = transform(n, quarter_turns, mirror, (r, c));
                        let (src, dst) = (r * n + c, tr * n + tc);
                        for k in 0..PLANES {
                            planes[k * area + dst] = sample.planes[k * area + src];
                        }
                        probs[dst] = sample.probs[src];
                    }
                }
                out.push(TrainingSample { planes, probs, z: sample.z });
            }
        }
    }
    out
}

/// Play `first` (as Player 1) against `second` and report the winner
pub fn play_match<G, A, B>(first: &mut A, second: &mut B, start: &G) -> Result<Option<Player>, SearchError>
where
    G: Game,
    A: Agent<G> + ?Sized,
    B: Agent<G> + ?Sized,
{
    let mut game = start.clone();
    first.reset();
    second.reset();
    while !game.is_over() {
        let action = match game.active_player() {
            Player::P1 => first.choose_action(&game)?,
            Player::P2 => second.choose_action(&game)?,
        };
        game.apply(action)?;
    }
    Ok(game.winner())
}

/// Results of a series of games, from the first agent's point of view
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub wins: usize,
    pub losses: usize,
    pub ties: usize,
}

impl MatchStats {
    pub fn games(&self) -> usize {
        self.wins + self.losses + self.ties
    }

    /// (wins + ties / 2) / games
    pub fn win_ratio(&self) -> f64 {
        if self.games() == 0 {
            return 0.0;
        }
        (self.wins as f64 + 0.5 * self.ties as f64) / self.games() as f64
    }
}

/// Play `n_games` between `a` and `b`, alternating who moves first (`a` starts game 0)
pub fn evaluate_agents<G, A, B>(a: &mut A, b: &mut B, n_games: usize, start: &G) -> Result<MatchStats, SearchError>
where
    G: Game,
    A: Agent<G> + ?Sized,
    B: Agent<G> + ?Sized,
{
    let mut stats = MatchStats::default();
    for i in 0..n_games {
        let (winner, a_side) = if i % 2 == 0 {
            (play_match(a, b, start)?, Player::P1)
        } else {
            (play_match(b, a, start)?, Player::P2)
        };
        match winner {
            None => stats.ties += 1,
            Some(w) if w == a_side => stats.wins += 1,
            Some(_) => stats.losses += 1,
        }
        debug!("evaluation game {}: winner {:?}, {} playing {}", i, winner, a.name(), a_side);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcts::{pure_mcts_player, AlphaZeroConfig, RolloutEvaluator};
    use crate::utils::Action;
    use rand::rngs::StdRng;
    use rand::seq::IndexedRandom;
    use rand::SeedableRng;

    struct RandomAgent(StdRng);

    impl<G: Game> Agent<G> for RandomAgent {
        fn name(&self) -> String {
            "random".into()
        }
        fn reset(&mut self) {}
        fn choose_action(&mut self, game: &G) -> Result<Action, SearchError> {
            Ok(*game.available_actions().choose(&mut self.0).unwrap())
        }
    }

    fn sample_at(n: usize, cell: usize) -> TrainingSample {
        let area = n * n;
        let mut planes = vec![0.0; PLANES * area];
        planes[cell] = 1.0;
        planes[2 * area + cell] = 1.0;
        planes[3 * area..].fill(1.0);
        let mut probs = vec![0.0; area];
        probs[cell] = 1.0;
        TrainingSample { planes, probs, z: -1.0 }
    }

    #[test]
    fn augmentation_yields_the_eight_symmetries() {
        let n = 4;
        // (0, 1) has no symmetry of its own on a 4x4 board
        let out = augment(&[sample_at(n, 1)], n, n);
        assert_eq!(out.len(), 8);
        let mut cells: Vec<usize> = out.iter().map(|s| s.probs.iter().position(|&p| p == 1.0).unwrap()).collect();
        cells.sort();
        cells.dedup();
        assert_eq!(cells, vec![1, 2, 4, 7, 8, 11, 13, 14]);
        for s in &out {
            let cell = s.probs.iter().position(|&p| p == 1.0).unwrap();
            assert_eq!(s.planes[cell], 1.0);
            assert_eq!(s.planes[2 * n * n + cell], 1.0);
            assert_eq!(s.planes.iter().sum::<f32>(), 2.0 + (n * n) as f32);
            assert_eq!(s.z, -1.0);
        }
        assert_eq!(out[0], sample_at(n, 1));
    }

    #[test]
    fn rectangular_boards_are_not_augmented() {
        let sample = TrainingSample { planes: vec![0.0; PLANES * 6], probs: vec![0.0; 6], z: 0.0 };
        assert_eq!(augment(&[sample.clone()], 3, 2), vec![sample]);
    }

    #[test]
    fn self_play_labels_positions_with_the_result() {
        let start = Gomoku::with_size(3, 3, 3).unwrap();
        let config = AlphaZeroConfig { n_playout: 30, ..Default::default() };
        let mut player = MctsPlayer::new(RolloutEvaluator::new(8), config, true, 8);
        let (winner, samples) = self_play_game(&mut player, &start, 1.0).unwrap();
        assert!(!samples.is_empty() && samples.len() <= 9);
        for (i, s) in samples.iter().enumerate() {
            assert!((s.probs.iter().sum::<f32>() - 1.0).abs() < 1e-4);
            let p1_to_move = s.planes[3 * 9] == 1.0;
            assert_eq!(p1_to_move, i % 2 == 0);
            let expected = match winner {
                None => 0.0,
                Some(Player::P1) if p1_to_move => 1.0,
                Some(Player::P2) if !p1_to_move => 1.0,
                Some(_) => -1.0,
            };
            assert_eq!(s.z, expected);
        }
    }

    #[test]
    fn search_beats_random_play() {
        let start = Gomoku::with_size(3, 3, 3).unwrap();
        let mut mcts = pure_mcts_player(5.0, 300, 21);
        let mut random = RandomAgent(StdRng::seed_from_u64(21));
        let stats = evaluate_agents(&mut mcts, &mut random, 6, &start).unwrap();
        assert_eq!(stats.games(), 6);
        assert!(stats.win_ratio() > 0.5, "{:?}", stats);
    }

    #[test]
    fn win_ratio_counts_ties_as_half() {
        let stats = MatchStats { wins: 3, losses: 5, ties: 2 };
        assert!((stats.win_ratio() - 0.4).abs() < 1e-12);
        assert_eq!(MatchStats::default().win_ratio(), 0.0);
    }
}
