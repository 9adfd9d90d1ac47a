use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::GameError;

// ---------- Basic types (renamed for pretty) ---------- //
pub type Reward = f64;
pub type Probability = f64;
/// Index of a move in a game's flat action space
pub type Action = usize;

/// Both homework games are two player, zero sum, perfect information
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Player { P1, P2 }

impl Player {
    #[inline] pub fn other(self) -> Player {
        match self { Player::P1 => Player::P2, Player::P2 => Player::P1 }
    }
    /// Outcome value of a win for this player (+ good for P1, - for P2)
    pub fn best_value(self) -> Reward {
        match self { Player::P1 => 1.0, Player::P2 => -1.0 }
    }
}

impl Display for Player {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Player::P1 => write!(f, "Player 1"),
            Player::P2 => write!(f, "Player 2"),
        }
    }
}

// ---------- Traits the game must provide ----------
pub trait Game: Sized + Clone + Debug {
    /// Size of the flat action space (every action index is below this)
    fn action_space(&self) -> usize;
    /// The player whose turn it is
    fn active_player(&self) -> Player;
    /// What actions the active_player can take
    fn available_actions(&self) -> Vec<Action>;
    /// Take an action in place, rejecting illegal ones
    fn apply(&mut self, action: Action) -> Result<(), GameError>;
    /// Check if the game is over
    fn is_over(&self) -> bool;
    /// The winner of a finished game (None while playing or on a draw)
    fn winner(&self) -> Option<Player>;

    /// Create a new copy of the game after this specified action is taken
    fn play(&self, action: Action) -> Result<Self, GameError> {
        let mut next = self.clone();
        next.apply(action)?;
        Ok(next)
    }
    /// Terminal evaluation (+ good for P1, - for P2, 0 for a draw or an unfinished game)
    fn evaluate(&self) -> Reward {
        self.winner().map_or(0.0, Player::best_value)
    }
}

// ---------- Numeric helpers ---------- //
/// Index of the first maximum, matching the order the values were produced in
pub fn first_argmax(values: &[Reward]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        match best {
            Some(b) if values[b] >= *v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// softmax(log(visits) / temperature), the visit count distribution at a given temperature
pub fn visit_distribution(visits: &[u32], temperature: f64) -> Vec<Probability> {
    if visits.is_empty() {
        return vec![];
    }
    let temperature = temperature.max(1e-3);
    let logits: Vec<f64> = visits.iter().map(|&n| (n as f64 + 1e-10).ln() / temperature).collect();
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_argmax_prefers_earliest_tie() {
        assert_eq!(first_argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(first_argmax(&[-5.0]), Some(0));
        assert_eq!(first_argmax(&[]), None);
    }

    #[test]
    fn visit_distribution_sums_to_one() {
        let p = visit_distribution(&[10, 30, 0, 60], 1.0);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((p[3] - 0.6).abs() < 1e-6);
        assert!(p[2] < 1e-9);
    }

    #[test]
    fn low_temperature_is_nearly_greedy() {
        let p = visit_distribution(&[10, 11, 9], 1e-3);
        assert!(p[1] > 0.999);
    }

    #[test]
    fn player_alternates() {
        assert_eq!(Player::P1.other(), Player::P2);
        assert_eq!(Player::P2.other().best_value(), 1.0);
    }
}
