use std::path::PathBuf;

use crate::utils::Action;

/// Errors raised while building or loading a grid layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("layout has no cells")]
    Empty,

    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },

    #[error("unknown cell code '{code}' at ({row}, {col})")]
    UnknownCell { row: usize, col: usize, code: String },

    #[error("layout needs exactly one {what}, found {count}")]
    Marker { what: &'static str, count: usize },

    #[error("unknown preset layout '{0}'")]
    UnknownPreset(String),

    #[error("failed to read layout file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised by the dynamic programming solvers.
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    #[error("{algorithm} did not converge within {iterations} iterations")]
    NotConverged { algorithm: &'static str, iterations: usize },
}

/// Errors raised by board games and the search playing them.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("illegal move {action}: {reason}")]
    IllegalMove { action: Action, reason: &'static str },

    #[error("invalid board {width}x{height} with {n_in_row} in a row")]
    InvalidBoard { width: usize, height: usize, n_in_row: usize },

    #[error("the game is already over")]
    GameOver,

    #[error("no legal move available")]
    NoMoves,
}

/// Errors raised by tree search and the evaluators driving it.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("game error: {0}")]
    Game(#[from] GameError),

    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to write TOML: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Errors that can occur while saving or loading model checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while exporting run reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during AlphaZero training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("game error: {0}")]
    Game(#[from] GameError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("tensor data error: {0}")]
    Tensor(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_error_display() {
        let err = LayoutError::Marker { what: "start", count: 2 };
        assert_eq!(err.to_string(), "layout needs exactly one start, found 2");
    }

    #[test]
    fn game_error_display() {
        let err = GameError::IllegalMove { action: 12, reason: "cell is occupied" };
        assert_eq!(err.to_string(), "illegal move 12: cell is occupied");
    }

    #[test]
    fn training_error_wraps_game_error() {
        let err: TrainingError = GameError::GameOver.into();
        assert_eq!(err.to_string(), "game error: the game is already over");
    }
}
