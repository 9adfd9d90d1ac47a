use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::utils::{Action, Game, Player};
/*
 Moves are flat indices, row 0 at the top:
+----------------------+
|  0  1  2  3 ...  w-1 |
|  w w+1 ...           |
|  ...                 |
+----------------------+
*/

const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
/// Number of feature planes produced by [`Gomoku::encode_planes`]
pub const PLANES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GomokuConfig {
    pub width: usize,
    pub height: usize,
    /// Stones in a line needed to win
    pub n_in_row: usize,
}

impl Default for GomokuConfig {
    fn default() -> Self {
        Self { width: 8, height: 8, n_in_row: 5 }
    }
}

impl GomokuConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.width == 0 || self.height == 0 || self.n_in_row == 0 || self.n_in_row > self.width.min(self.height) {
            return Err(GameError::InvalidBoard { width: self.width, height: self.height, n_in_row: self.n_in_row });
        }
        Ok(())
    }

    #[inline]
    pub fn cells(&self) -> usize {
        self.width * self.height
    }
}

/// Free-style Gomoku (n in a row) on a small rectangular board. Player 1 moves first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gomoku {
    width: usize,
    height: usize,
    n_in_row: usize,
    board: Vec<Option<Player>>,
    current: Player,
    last_move: Option<Action>,
    winner: Option<Player>,
    stones: usize,
}

impl Gomoku {
    pub fn new(cfg: GomokuConfig) -> Result<Self, GameError> {
        cfg.validate()?;
        Ok(Self {
            width: cfg.width,
            height: cfg.height,
            n_in_row: cfg.n_in_row,
            board: vec![None; cfg.cells()],
            current: Player::P1,
            last_move: None,
            winner: None,
            stones: 0,
        })
    }

    pub fn with_size(width: usize, height: usize, n_in_row: usize) -> Result<Self, GameError> {
        Self::new(GomokuConfig { width, height, n_in_row })
    }

    #[inline] pub fn width(&self) -> usize { self.width }
    #[inline] pub fn height(&self) -> usize { self.height }
    #[inline] pub fn n_in_row(&self) -> usize { self.n_in_row }
    #[inline] pub fn last_move(&self) -> Option<Action> { self.last_move }
    #[inline] pub fn stones(&self) -> usize { self.stones }

    pub fn config(&self) -> GomokuConfig {
        GomokuConfig { width: self.width, height: self.height, n_in_row: self.n_in_row }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Player> {
        self.location_to_move(row, col).and_then(|mv| self.board[mv])
    }

    /// `(row, col)` of a flat move index
    pub fn move_to_location(&self, mv: Action) -> (usize, usize) {
        (mv / self.width, mv % self.width)
    }

    pub fn location_to_move(&self, row: usize, col: usize) -> Option<Action> {
        (row < self.height && col < self.width).then_some(row * self.width + col)
    }

    /// Place a stone for the player to move
    pub fn try_play(&mut self, mv: Action) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        match self.board.get(mv) {
            None => return Err(GameError::IllegalMove { action: mv, reason: "outside the board" }),
            Some(Some(_)) => return Err(GameError::IllegalMove { action: mv, reason: "cell is occupied" }),
            Some(None) => {}
        }
        self.board[mv] = Some(self.current);
        self.stones += 1;
        self.last_move = Some(mv);
        if self.completes_line(mv) {
            self.winner = Some(self.current);
        }
        self.current = self.current.other();
        Ok(())
    }

    /// Stones of the same colour in a row through `mv`, counting both directions
    fn completes_line(&self, mv: Action) -> bool {
        let Some(player) = self.board[mv] else { return false };
        let (row, col) = self.move_to_location(mv);
        DIRECTIONS.iter().any(|&(dr, dc)| {
            1 + self.run_length(row, col, dr, dc, player) + self.run_length(row, col, -dr, -dc, player)
                >= self.n_in_row
        })
    }

    fn run_length(&self, row: usize, col: usize, dr: isize, dc: isize, player: Player) -> usize {
        let mut count = 0;
        let (mut r, mut c) = (row as isize + dr, col as isize + dc);
        while r >= 0 && c >= 0 && self.cell(r as usize, c as usize) == Some(player) {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }

    /// 4 x height x width planes seen by the player to move: own stones, opponent stones,
    /// the last move, and a constant plane that is all ones when the first player is to move
    pub fn encode_planes(&self) -> Vec<f32> {
        let area = self.width * self.height;
        let mut planes = vec![0.0f32; PLANES * area];
        for (i, stone) in self.board.iter().enumerate() {
            match stone {
                Some(p) if *p == self.current => planes[i] = 1.0,
                Some(_) => planes[area + i] = 1.0,
                None => {}
            }
        }
        if let Some(mv) = self.last_move {
            planes[2 * area + mv] = 1.0;
        }
        if self.current == Player::P1 {
            planes[3 * area..].fill(1.0);
        }
        planes
    }
}

impl Game for Gomoku {
    fn action_space(&self) -> usize {
        self.width * self.height
    }

    fn active_player(&self) -> Player {
        self.current
    }

    fn available_actions(&self) -> Vec<Action> {
        if self.is_over() {
            return vec![];
        }
        (0..self.board.len()).filter(|&i| self.board[i].is_none()).collect()
    }

    fn apply(&mut self, action: Action) -> Result<(), GameError> {
        self.try_play(action)
    }

    fn is_over(&self) -> bool {
        self.winner.is_some() || self.stones == self.board.len()
    }

    fn winner(&self) -> Option<Player> {
        self.winner
    }
}

impl Display for Gomoku {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "   ")?;
        for col in 0..self.width {
            write!(f, "{:>3}", col)?;
        }
        writeln!(f)?;
        for row in 0..self.height {
            write!(f, "{:>3}", row)?;
            for col in 0..self.width {
                let symbol = match self.cell(row, col) {
                    Some(Player::P1) => 'X',
                    Some(Player::P2) => 'O',
                    None => '.',
                };
                write!(f, "{:>3}", symbol)?;
            }
            writeln!(f)?;
        }
        match (self.winner, self.is_over()) {
            (Some(p), _) => write!(f, "{} won", p),
            (None, true) => write!(f, "Draw"),
            (None, false) => write!(f, "{} to play", self.current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_all(game: &mut Gomoku, moves: &[(usize, usize)]) {
        for &(r, c) in moves {
            let mv = game.location_to_move(r, c).unwrap();
            game.try_play(mv).unwrap();
        }
    }

    #[test]
    fn rejects_inconsistent_boards() {
        assert!(Gomoku::with_size(3, 3, 4).is_err());
        assert!(Gomoku::with_size(0, 5, 1).is_err());
        assert!(Gomoku::with_size(6, 4, 4).is_ok());
    }

    #[test]
    fn horizontal_win() {
        let mut g = Gomoku::with_size(6, 6, 4).unwrap();
        play_all(&mut g, &[(0, 0), (5, 0), (0, 1), (5, 1), (0, 3), (5, 5)]);
        assert!(!g.is_over());
        play_all(&mut g, &[(0, 2)]);
        assert_eq!(g.winner(), Some(Player::P1));
        assert_eq!(g.evaluate(), 1.0);
        assert!(g.available_actions().is_empty());
    }

    #[test]
    fn vertical_and_diagonal_wins() {
        let mut g = Gomoku::with_size(6, 6, 3).unwrap();
        play_all(&mut g, &[(0, 0), (0, 5), (1, 0), (1, 5), (3, 3), (2, 5)]);
        assert_eq!(g.winner(), Some(Player::P2));

        let mut g = Gomoku::with_size(6, 6, 3).unwrap();
        play_all(&mut g, &[(0, 0), (0, 5), (1, 1), (5, 5), (2, 2)]);
        assert_eq!(g.winner(), Some(Player::P1));

        let mut g = Gomoku::with_size(6, 6, 3).unwrap();
        play_all(&mut g, &[(0, 4), (5, 5), (2, 2), (5, 4), (1, 3)]);
        assert_eq!(g.winner(), Some(Player::P1));
    }

    #[test]
    fn full_board_is_a_draw() {
        let mut g = Gomoku::with_size(3, 3, 3).unwrap();
        // X O X / X O O / O X X
        play_all(&mut g, &[(0, 0), (0, 1), (0, 2), (1, 1), (1, 0), (1, 2), (2, 1), (2, 0), (2, 2)]);
        assert!(g.is_over());
        assert_eq!(g.winner(), None);
        assert_eq!(g.evaluate(), 0.0);
        assert!(g.to_string().ends_with("Draw"));
    }

    #[test]
    fn illegal_moves_are_errors() {
        let mut g = Gomoku::with_size(4, 4, 3).unwrap();
        g.try_play(5).unwrap();
        assert!(matches!(g.try_play(5), Err(GameError::IllegalMove { action: 5, .. })));
        assert!(matches!(g.try_play(16), Err(GameError::IllegalMove { reason: "outside the board", .. })));
        assert_eq!(g.active_player(), Player::P2);

        let mut done = Gomoku::with_size(3, 3, 1).unwrap();
        done.try_play(0).unwrap();
        assert!(matches!(done.try_play(1), Err(GameError::GameOver)));
    }

    #[test]
    fn play_leaves_the_original_untouched() {
        let g = Gomoku::with_size(4, 4, 3).unwrap();
        let next = g.play(6).unwrap();
        assert_eq!(g.stones(), 0);
        assert_eq!(next.cell(1, 2), Some(Player::P1));
        assert_eq!(next.last_move(), Some(6));
        assert_eq!(next.available_actions().len(), 15);
    }

    #[test]
    fn planes_follow_the_player_to_move() {
        let mut g = Gomoku::with_size(3, 3, 3).unwrap();
        let area = 9;
        let planes = g.encode_planes();
        assert_eq!(planes.len(), PLANES * area);
        assert!(planes[3 * area..].iter().all(|&v| v == 1.0));

        g.try_play(4).unwrap();
        let planes = g.encode_planes();
        // Player 2 to move: the centre stone belongs to the opponent
        assert_eq!(planes[4], 0.0);
        assert_eq!(planes[area + 4], 1.0);
        assert_eq!(planes[2 * area + 4], 1.0);
        assert!(planes[3 * area..].iter().all(|&v| v == 0.0));

        g.try_play(0).unwrap();
        let planes = g.encode_planes();
        assert_eq!(planes[4], 1.0);
        assert_eq!(planes[area], 1.0);
        assert_eq!(planes[2 * area], 1.0);
        assert_eq!(planes[2 * area + 4], 0.0);
    }

    #[test]
    fn locations_round_trip() {
        let g = Gomoku::with_size(5, 3, 3).unwrap();
        assert_eq!(g.move_to_location(7), (1, 2));
        assert_eq!(g.location_to_move(1, 2), Some(7));
        assert_eq!(g.location_to_move(3, 0), None);
    }
}
