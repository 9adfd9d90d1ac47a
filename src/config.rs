//! Application configuration, loaded from a TOML file where every section is optional.
//!
//! ```toml
//! [maze]
//! gamma = 0.9
//!
//! [td]
//! episodes = 500
//! epsilon = 0.1
//!
//! [gomoku]
//! width = 6
//! height = 6
//! n_in_row = 4
//! ```

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::games::GomokuConfig;
use crate::grid::GridRewards;
use crate::mcts::AlphaZeroConfig;
use crate::planning::PlanningConfig;
use crate::td::TdConfig;
use crate::training::TrainerConfig;
use crate::utils::Reward;

/// Reward schemes of the two grid worlds.
/// Fields missing from a partial table keep that world's own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    #[serde(deserialize_with = "maze_rewards")]
    pub maze: GridRewards,
    #[serde(deserialize_with = "cliff_rewards")]
    pub cliff: GridRewards,
}

/// A reward table where every entry is optional
#[derive(Deserialize)]
struct RewardOverrides {
    step: Option<Reward>,
    goal: Option<Reward>,
    wall: Option<Reward>,
    cliff: Option<Reward>,
}

impl RewardOverrides {
    fn over(self, base: GridRewards) -> GridRewards {
        GridRewards {
            step: self.step.unwrap_or(base.step),
            goal: self.goal.unwrap_or(base.goal),
            wall: self.wall.unwrap_or(base.wall),
            cliff: self.cliff.unwrap_or(base.cliff),
        }
    }
}

fn maze_rewards<'de, D: Deserializer<'de>>(deserializer: D) -> Result<GridRewards, D::Error> {
    Ok(RewardOverrides::deserialize(deserializer)?.over(GridRewards::maze()))
}

fn cliff_rewards<'de, D: Deserializer<'de>>(deserializer: D) -> Result<GridRewards, D::Error> {
    Ok(RewardOverrides::deserialize(deserializer)?.over(GridRewards::cliff_walk()))
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self { maze: GridRewards::maze(), cliff: GridRewards::cliff_walk() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub maze: PlanningConfig,
    pub rewards: RewardsConfig,
    pub td: TdConfig,
    pub gomoku: GomokuConfig,
    pub alphazero: AlphaZeroConfig,
    pub training: TrainerConfig,
}

fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Validation(msg()))
    }
}

impl AppConfig {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::FileRead { path: path.to_path_buf(), source })?;
        let config = Self::from_toml(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The defaults rendered as a TOML document
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.maze;
        check((0.0..=1.0).contains(&m.gamma), || format!("maze.gamma must be in [0, 1], got {}", m.gamma))?;
        check(m.theta > 0.0, || format!("maze.theta must be positive, got {}", m.theta))?;
        check(m.truncation >= 1, || "maze.truncation must be at least 1".into())?;
        check(m.max_iterations >= 1, || "maze.max_iterations must be at least 1".into())?;

        let td = &self.td;
        check(td.alpha > 0.0 && td.alpha <= 1.0, || format!("td.alpha must be in (0, 1], got {}", td.alpha))?;
        check((0.0..=1.0).contains(&td.gamma), || format!("td.gamma must be in [0, 1], got {}", td.gamma))?;
        check((0.0..=1.0).contains(&td.epsilon), || format!("td.epsilon must be in [0, 1], got {}", td.epsilon))?;
        check(td.n_steps >= 1, || "td.n_steps must be at least 1".into())?;
        check(td.episodes > 0, || "td.episodes must be positive".into())?;
        check(td.max_steps_per_episode > 0, || "td.max_steps_per_episode must be positive".into())?;

        self.gomoku.validate().map_err(|e| ConfigError::Validation(format!("gomoku: {}", e)))?;

        let az = &self.alphazero;
        check(az.c_puct > 0.0, || format!("alphazero.c_puct must be positive, got {}", az.c_puct))?;
        check(az.n_playout >= 1, || "alphazero.n_playout must be at least 1".into())?;
        check(az.temperature > 0.0, || format!("alphazero.temperature must be positive, got {}", az.temperature))?;
        check(az.dirichlet_alpha > 0.0, || "alphazero.dirichlet_alpha must be positive".into())?;
        check((0.0..=1.0).contains(&az.noise_weight), || {
            format!("alphazero.noise_weight must be in [0, 1], got {}", az.noise_weight)
        })?;

        let t = &self.training;
        check(t.learning_rate > 0.0, || format!("training.learning_rate must be positive, got {}", t.learning_rate))?;
        check(t.l2_const >= 0.0, || "training.l2_const must not be negative".into())?;
        check(t.batch_size >= 1 && t.batch_size <= t.buffer_size, || {
            format!("training.batch_size ({}) must be in [1, buffer_size ({})]", t.batch_size, t.buffer_size)
        })?;
        check(t.epochs >= 1, || "training.epochs must be at least 1".into())?;
        check(t.kl_target > 0.0, || "training.kl_target must be positive".into())?;
        check(t.play_batch_size >= 1, || "training.play_batch_size must be at least 1".into())?;
        check(t.game_batch_num > 0, || "training.game_batch_num must be positive".into())?;
        check(t.check_freq >= 1, || "training.check_freq must be at least 1".into())?;
        check(t.pure_mcts_playouts >= 1, || "training.pure_mcts_playouts must be at least 1".into())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.maze.gamma, 0.9);
        assert_eq!(config.td.episodes, 500);
        assert_eq!(config.gomoku, GomokuConfig { width: 8, height: 8, n_in_row: 5 });
        assert_eq!(config.training.batch_size, 512);
        assert_eq!(config.rewards.cliff.goal, 0.0);
    }

    #[test]
    fn default_toml_parses_back() {
        let text = AppConfig::default_toml().unwrap();
        assert!(text.contains("[alphazero]"));
        let config = AppConfig::from_toml(&text).unwrap();
        assert_eq!(config.training.learning_rate, 2e-3);
        assert_eq!(config.training.seed, None);
    }

    #[test]
    fn partial_toml_keeps_the_other_defaults() {
        let config = AppConfig::from_toml(
            "[td]\nepisodes = 50\n\n[gomoku]\nwidth = 6\nheight = 6\nn_in_row = 4\n\n[training]\nseed = 7\n",
        )
        .unwrap();
        assert_eq!(config.td.episodes, 50);
        assert_eq!(config.td.alpha, 0.5);
        assert_eq!(config.gomoku.n_in_row, 4);
        assert_eq!(config.training.seed, Some(7));
        assert_eq!(config.maze.theta, 1e-6);
    }

    #[test]
    fn partial_reward_tables_keep_their_own_defaults() {
        let config = AppConfig::from_toml("[rewards.cliff]\nstep = -2.0\n").unwrap();
        assert_eq!(config.rewards.cliff, GridRewards { step: -2.0, ..GridRewards::cliff_walk() });
        assert_eq!(config.rewards.cliff.goal, 0.0);
        assert_eq!(config.rewards.maze, GridRewards::maze());

        let config = AppConfig::from_toml("[rewards.maze]\nwall = -5.0\n").unwrap();
        assert_eq!(config.rewards.maze, GridRewards { wall: -5.0, ..GridRewards::maze() });
        assert_eq!(config.rewards.cliff, GridRewards::cliff_walk());
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "[maze]\ngamma = 1.5\n",
            "[maze]\ntheta = 0.0\n",
            "[td]\nalpha = 0.0\n",
            "[td]\nepsilon = -0.1\n",
            "[td]\nn_steps = 0\n",
            "[gomoku]\nwidth = 3\nheight = 3\nn_in_row = 5\n",
            "[alphazero]\nc_puct = 0.0\n",
            "[alphazero]\nnoise_weight = 2.0\n",
            "[training]\nbatch_size = 20000\n",
            "[training]\nlearning_rate = 0.0\n",
        ] {
            assert!(matches!(AppConfig::from_toml(text), Err(ConfigError::Validation(_))), "{}", text);
        }
        assert!(matches!(AppConfig::from_toml("[td\n"), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn files_load_and_missing_files_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::FileRead { .. })));
        assert_eq!(AppConfig::load_or_default(&path).unwrap().td.episodes, 500);

        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[rewards.maze]\ngoal = 5.0").unwrap();
        drop(file);
        let config = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(config.rewards.maze.goal, 5.0);
        assert_eq!(config.rewards.maze.step, -1.0);
    }
}
