//! # Game Implementations
//!
//! Board games played by the search and self-play code. Every game implements
//! [`Game`](crate::utils::Game):
//! - **Gomoku**: n in a row on a small board, the AlphaZero homework game

pub mod gomoku;

pub use gomoku::{Gomoku, GomokuConfig};
