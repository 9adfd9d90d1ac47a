//! Reinforcement learning and game-playing coursework.
//!
//! - [`grid`] and [`planning`]: grid-world mazes solved with dynamic programming and graph search
//! - [`td`]: temporal-difference control on the cliff walk
//! - [`games`], [`mcts`], [`neural`], [`self_play`] and [`training`]: AlphaZero for Gomoku
#![allow(clippy::type_complexity)]

pub mod config;
pub mod error;
pub mod games;
pub mod grid;
pub mod mcts;
pub mod neural;
pub mod planning;
pub mod report;
pub mod self_play;
pub mod td;
pub mod training;
pub mod utils;
