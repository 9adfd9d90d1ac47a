//! # AlphaZero Training
//!
//! The training pipeline for Gomoku:
//! - **Self-play**: the current network drives MCTS for both sides, positions go into a
//!   bounded replay buffer after symmetry augmentation
//! - **Updates**: a few Adam epochs per mini-batch with the learning rate adapted to the
//!   KL divergence between the old and new policies
//! - **Evaluation**: periodic matches against pure MCTS, with checkpoints of the current
//!   and the best network

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::TensorData;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{CheckpointError, TrainingError};
use crate::games::gomoku::{Gomoku, GomokuConfig, PLANES};
use crate::mcts::{pure_mcts_player, AlphaZeroConfig, MctsPlayer};
use crate::neural::{planes_to_tensor, InferBackend, NetworkEvaluator, PolicyValueNet, TrainBackend};
use crate::self_play::{augment, evaluate_agents, self_play_game, TrainingSample};

const CURRENT_MODEL: &str = "current_policy";
const BEST_MODEL: &str = "best_policy";
const STATE_FILE: &str = "training_state.json";

/// Configuration for training sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    /// L2 penalty, applied as Adam weight decay
    pub l2_const: f64,
    pub buffer_size: usize,
    pub batch_size: usize,
    /// Gradient steps per update
    pub epochs: usize,
    pub kl_target: f64,
    /// Self-play games per training batch
    pub play_batch_size: usize,
    /// Training batches in a run
    pub game_batch_num: usize,
    /// Evaluate and checkpoint every this many batches
    pub check_freq: usize,
    pub eval_games: usize,
    /// Initial strength of the pure MCTS opponent
    pub pure_mcts_playouts: usize,
    pub pure_mcts_max_playouts: usize,
    pub pure_mcts_step: usize,
    pub checkpoint_dir: PathBuf,
    /// Seed for self-play and sampling; taken from the OS when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub progress: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 2e-3,
            l2_const: 1e-4,
            buffer_size: 10_000,
            batch_size: 512,
            epochs: 5,
            kl_target: 0.02,
            play_batch_size: 1,
            game_batch_num: 1500,
            check_freq: 50,
            eval_games: 10,
            pure_mcts_playouts: 1000,
            pure_mcts_max_playouts: 5000,
            pure_mcts_step: 1000,
            checkpoint_dir: PathBuf::from("checkpoints"),
            seed: None,
            progress: true,
        }
    }
}

// ---------- Learner ---------- //
/// Loss and policy entropy of one gradient step
#[derive(Debug, Clone, Copy)]
pub struct StepStats {
    pub loss: f32,
    pub entropy: f32,
}

fn to_vec<B: Backend, const D: usize>(t: Tensor<B, D>) -> Result<Vec<f32>, TrainingError> {
    t.into_data().to_vec::<f32>().map_err(|e| TrainingError::Tensor(format!("{:?}", e)))
}

/// The trainable network and its optimizer
pub struct PolicyValueLearner {
    model: PolicyValueNet<TrainBackend>,
    optimizer: OptimizerAdaptor<Adam, PolicyValueNet<TrainBackend>, TrainBackend>,
    device: <TrainBackend as Backend>::Device,
    width: usize,
    height: usize,
}

impl PolicyValueLearner {
    pub fn new(width: usize, height: usize, l2_const: f64) -> Self {
        let device = Default::default();
        Self {
            model: PolicyValueNet::new(width, height, &device),
            optimizer: AdamConfig::new().with_weight_decay(Some(WeightDecayConfig::new(l2_const as f32))).init(),
            device,
            width,
            height,
        }
    }

    /// Replace the weights with those saved at `path`
    pub fn load_weights(&mut self, path: &Path) -> Result<(), CheckpointError> {
        self.model = PolicyValueNet::load(path, self.width, self.height, &self.device)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        self.model.valid().save(path)
    }

    /// Inference copy of the network
    pub fn inference_net(&self) -> PolicyValueNet<InferBackend> {
        self.model.valid()
    }

    pub fn evaluator(&self) -> NetworkEvaluator {
        NetworkEvaluator::new(self.inference_net())
    }

    /// Move probabilities (flattened, `area` per position) and values for a batch of encoded positions
    pub fn predict(&self, planes: &[f32]) -> Result<(Vec<f32>, Vec<f32>), TrainingError> {
        let device = Default::default();
        let input = planes_to_tensor::<InferBackend>(planes, self.height, self.width, &device);
        let (log_probs, values) = self.model.valid().forward(input);
        Ok((to_vec(log_probs.exp())?, to_vec(values)?))
    }

    /// One Adam step on `(z - v)^2 - pi . log p`
    pub fn train_step(&mut self, planes: &[f32], probs: &[f32], z: &[f32], lr: f64) -> Result<StepStats, TrainingError> {
        let batch = z.len();
        let area = self.width * self.height;
        let input = planes_to_tensor::<TrainBackend>(planes, self.height, self.width, &self.device);
        let target_probs =
            Tensor::<TrainBackend, 1>::from_data(TensorData::from(probs), &self.device).reshape([batch, area]);
        let target_values = Tensor::<TrainBackend, 1>::from_data(TensorData::from(z), &self.device).reshape([batch, 1]);

        let (log_probs, values) = self.model.forward(input);
        let value_loss = (values - target_values).powf_scalar(2.0).mean();
        let policy_loss = (target_probs * log_probs.clone()).sum_dim(1).mean().neg();
        let loss = value_loss + policy_loss;
        let entropy = (log_probs.clone().exp() * log_probs).sum_dim(1).mean().neg();

        let loss_value = to_vec(loss.clone())?.first().copied().unwrap_or(f32::NAN);
        let entropy_value = to_vec(entropy)?.first().copied().unwrap_or(f32::NAN);

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = self.optimizer.step(lr, self.model.clone(), grads);
        Ok(StepStats { loss: loss_value, entropy: entropy_value })
    }
}

// ---------- Update statistics ---------- //
/// Mean over the batch of KL(old || new)
pub fn kl_divergence(old: &[f32], new: &[f32], area: usize) -> f64 {
    let batch = old.len() / area.max(1);
    if batch == 0 {
        return 0.0;
    }
    let total: f64 = old
        .iter()
        .zip(new)
        .map(|(&p, &q)| p as f64 * ((p as f64 + 1e-10).ln() - (q as f64 + 1e-10).ln()))
        .sum();
    total / batch as f64
}

fn variance(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64
}

/// 1 - Var(z - v) / Var(z)
pub fn explained_variance(z: &[f32], v: &[f32]) -> f64 {
    let z: Vec<f64> = z.iter().map(|&x| x as f64).collect();
    let residual: Vec<f64> = z.iter().zip(v).map(|(a, &b)| a - b as f64).collect();
    let var_z = variance(&z);
    if var_z == 0.0 {
        return 0.0;
    }
    1.0 - variance(&residual) / var_z
}

/// Shrink the learning rate after large policy jumps, grow it after tiny ones
pub fn adapt_lr_multiplier(multiplier: f64, kl: f64, kl_target: f64) -> f64 {
    if kl > kl_target * 2.0 && multiplier > 0.1 {
        multiplier / 1.5
    } else if kl < kl_target / 2.0 && multiplier < 10.0 {
        multiplier * 1.5
    } else {
        multiplier
    }
}

/// Bookkeeping after one evaluation round against pure MCTS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationOutcome {
    /// The ratio beat the previous best, so the network is the new best policy
    pub improved: bool,
    pub best_win_ratio: f64,
    pub pure_mcts_playouts: usize,
}

/// A new best ratio replaces the old one. A perfect score against an opponent below the
/// playout cap makes the opponent stronger and starts the best ratio over.
pub fn record_evaluation(
    win_ratio: f64,
    best_win_ratio: f64,
    pure_mcts_playouts: usize,
    config: &TrainerConfig,
) -> EvaluationOutcome {
    let mut outcome = EvaluationOutcome { improved: false, best_win_ratio, pure_mcts_playouts };
    if win_ratio <= best_win_ratio {
        return outcome;
    }
    outcome.improved = true;
    outcome.best_win_ratio = win_ratio;
    if win_ratio >= 1.0 && pure_mcts_playouts < config.pure_mcts_max_playouts {
        outcome.pure_mcts_playouts = pure_mcts_playouts + config.pure_mcts_step;
        outcome.best_win_ratio = 0.0;
    }
    outcome
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateStats {
    pub kl: f64,
    pub lr_multiplier: f64,
    pub loss: f32,
    pub entropy: f32,
    pub explained_var_old: f64,
    pub explained_var_new: f64,
    pub epochs_run: usize,
}

/// Progress persisted next to the model checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub batches: usize,
    pub lr_multiplier: f64,
    pub best_win_ratio: f64,
    pub pure_mcts_playouts: usize,
    pub board: GomokuConfig,
}

// ---------- Trainer ---------- //
/// Trainer that manages the training loop with checkpointing
pub struct Trainer {
    config: TrainerConfig,
    search: AlphaZeroConfig,
    start: Gomoku,
    learner: PolicyValueLearner,
    buffer: VecDeque<TrainingSample>,
    lr_multiplier: f64,
    best_win_ratio: f64,
    pure_mcts_playouts: usize,
    batches_done: usize,
    rng: StdRng,
}

impl Trainer {
    pub fn new(board: GomokuConfig, search: AlphaZeroConfig, config: TrainerConfig) -> Result<Self, TrainingError> {
        let start = Gomoku::new(board)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            learner: PolicyValueLearner::new(board.width, board.height, config.l2_const),
            buffer: VecDeque::with_capacity(config.buffer_size),
            lr_multiplier: 1.0,
            best_win_ratio: 0.0,
            pure_mcts_playouts: config.pure_mcts_playouts,
            batches_done: 0,
            start,
            search,
            config,
            rng,
        })
    }

    /// Start from saved weights instead of a fresh network
    pub fn with_model(mut self, path: &Path) -> Result<Self, TrainingError> {
        self.learner.load_weights(path)?;
        info!("Loaded initial model from {}", path.display());
        Ok(self)
    }

    /// Pick up a previous run from its checkpoint directory
    pub fn resume(mut self, dir: &Path) -> Result<Self, TrainingError> {
        self.learner.load_weights(&dir.join(CURRENT_MODEL))?;
        let state_path = dir.join(STATE_FILE);
        if state_path.exists() {
            let state: TrainingState =
                serde_json::from_str(&fs::read_to_string(&state_path).map_err(CheckpointError::from)?)
                    .map_err(CheckpointError::from)?;
            if state.board != self.start.config() {
                warn!("Checkpoint board {:?} differs from the configured board", state.board);
            }
            self.batches_done = state.batches;
            self.lr_multiplier = state.lr_multiplier;
            self.best_win_ratio = state.best_win_ratio;
            self.pure_mcts_playouts = state.pure_mcts_playouts;
        }
        info!("Resumed from {} after {} batches", dir.display(), self.batches_done);
        Ok(self)
    }

    pub fn learner(&self) -> &PolicyValueLearner {
        &self.learner
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn state(&self) -> TrainingState {
        TrainingState {
            batches: self.batches_done,
            lr_multiplier: self.lr_multiplier,
            best_win_ratio: self.best_win_ratio,
            pure_mcts_playouts: self.pure_mcts_playouts,
            board: self.start.config(),
        }
    }

    /// Play `n_games` self-play games into the replay buffer; returns the last game's length
    pub fn collect_selfplay_data(&mut self, n_games: usize) -> Result<usize, TrainingError> {
        let mut player = MctsPlayer::new(self.learner.evaluator(), self.search.clone(), true, self.rng.random());
        let mut episode_len = 0;
        for _ in 0..n_games {
            let (winner, samples) = self_play_game(&mut player, &self.start, self.search.temperature)?;
            episode_len = samples.len();
            debug!("self-play winner {:?} in {} moves", winner, episode_len);
            for sample in augment(&samples, self.start.width(), self.start.height()) {
                if self.buffer.len() == self.config.buffer_size {
                    self.buffer.pop_front();
                }
                self.buffer.push_back(sample);
            }
        }
        Ok(episode_len)
    }

    /// Up to `epochs` gradient steps on one random mini-batch
    pub fn policy_update(&mut self) -> Result<UpdateStats, TrainingError> {
        let n = self.config.batch_size.min(self.buffer.len());
        let batch: Vec<TrainingSample> =
            self.buffer.make_contiguous().choose_multiple(&mut self.rng, n).cloned().collect();
        let planes: Vec<f32> = batch.iter().flat_map(|s| s.planes.iter().copied()).collect();
        let probs: Vec<f32> = batch.iter().flat_map(|s| s.probs.iter().copied()).collect();
        let z: Vec<f32> = batch.iter().map(|s| s.z).collect();
        let area = self.start.width() * self.start.height();
        debug_assert_eq!(planes.len(), n * PLANES * area);

        let (old_probs, old_v) = self.learner.predict(&planes)?;
        let lr = self.config.learning_rate * self.lr_multiplier;
        let mut kl = 0.0;
        let mut last = StepStats { loss: f32::NAN, entropy: f32::NAN };
        let mut new_v = old_v.clone();
        let mut epochs_run = 0;
        for _ in 0..self.config.epochs {
            last = self.learner.train_step(&planes, &probs, &z, lr)?;
            epochs_run += 1;
            let (new_probs, v) = self.learner.predict(&planes)?;
            new_v = v;
            kl = kl_divergence(&old_probs, &new_probs, area);
            // stop early if the policy moved too far
            if kl > self.config.kl_target * 4.0 {
                break;
            }
        }
        self.lr_multiplier = adapt_lr_multiplier(self.lr_multiplier, kl, self.config.kl_target);

        let stats = UpdateStats {
            kl,
            lr_multiplier: self.lr_multiplier,
            loss: last.loss,
            entropy: last.entropy,
            explained_var_old: explained_variance(&z, &old_v),
            explained_var_new: explained_variance(&z, &new_v),
            epochs_run,
        };
        info!(
            "kl:{:.5}, lr_multiplier:{:.3}, loss:{:.4}, entropy:{:.4}, explained_var_old:{:.3}, explained_var_new:{:.3}",
            stats.kl, stats.lr_multiplier, stats.loss, stats.entropy, stats.explained_var_old, stats.explained_var_new
        );
        Ok(stats)
    }

    /// Win ratio of the current network (greedy MCTS) against pure MCTS
    pub fn policy_evaluate(&mut self, n_games: usize) -> Result<f64, TrainingError> {
        let mut current = MctsPlayer::new(self.learner.evaluator(), self.search.clone(), false, self.rng.random());
        let mut pure = pure_mcts_player(self.search.c_puct, self.pure_mcts_playouts, self.rng.random());
        let stats = evaluate_agents(&mut current, &mut pure, n_games, &self.start)?;
        info!(
            "num_playouts:{}, win: {}, lose: {}, tie:{}",
            self.pure_mcts_playouts, stats.wins, stats.losses, stats.ties
        );
        Ok(stats.win_ratio())
    }

    fn save_model(&self, name: &str) -> Result<(), TrainingError> {
        let dir = &self.config.checkpoint_dir;
        fs::create_dir_all(dir).map_err(CheckpointError::from)?;
        self.learner.save(&dir.join(name))?;
        Ok(())
    }

    fn write_state(&self) -> Result<(), TrainingError> {
        let dir = &self.config.checkpoint_dir;
        fs::create_dir_all(dir).map_err(CheckpointError::from)?;
        let state = serde_json::to_string_pretty(&self.state()).map_err(CheckpointError::from)?;
        fs::write(dir.join(STATE_FILE), state).map_err(CheckpointError::from)?;
        Ok(())
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(self.config.game_batch_num as u64);
        if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} batches {msg}") {
            bar.set_style(style);
        }
        bar
    }

    /// Run the full pipeline, returning the best win ratio reached
    pub fn run(&mut self) -> Result<f64, TrainingError> {
        let bar = self.progress_bar();
        bar.set_position(self.batches_done.min(self.config.game_batch_num) as u64);
        while self.batches_done < self.config.game_batch_num {
            let episode_len = self.collect_selfplay_data(self.config.play_batch_size)?;
            self.batches_done += 1;
            let i = self.batches_done;
            debug!("batch i:{}, episode_len:{}", i, episode_len);
            bar.set_message(format!("buffer {}", self.buffer.len()));
            bar.inc(1);

            if self.buffer.len() > self.config.batch_size {
                self.policy_update()?;
            }

            if self.config.check_freq > 0 && i % self.config.check_freq == 0 {
                info!("current self-play batch: {}", i);
                let win_ratio = self.policy_evaluate(self.config.eval_games)?;
                self.save_model(CURRENT_MODEL)?;
                let outcome =
                    record_evaluation(win_ratio, self.best_win_ratio, self.pure_mcts_playouts, &self.config);
                if outcome.improved {
                    info!("New best policy!!!!!!!!");
                    self.save_model(BEST_MODEL)?;
                }
                if outcome.pure_mcts_playouts != self.pure_mcts_playouts {
                    info!("Pure MCTS opponent raised to {} playouts", outcome.pure_mcts_playouts);
                }
                self.best_win_ratio = outcome.best_win_ratio;
                self.pure_mcts_playouts = outcome.pure_mcts_playouts;
                self.write_state()?;
            }
        }
        bar.finish_and_clear();
        info!("Training complete after {} batches", self.batches_done);
        Ok(self.best_win_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Game;

    fn tiny_samples(n: usize) -> Vec<TrainingSample> {
        let mut game = Gomoku::with_size(3, 3, 3).unwrap();
        let mut out = vec![];
        for mv in [4, 0, 2, 6, 3, 5, 1] {
            let mut probs = vec![0.0; 9];
            for a in game.available_actions() {
                probs[a] = if a == mv { 0.6 } else { 0.4 / (game.available_actions().len() - 1) as f32 };
            }
            let z = if game.active_player() == crate::utils::Player::P1 { 1.0 } else { -1.0 };
            out.push(TrainingSample { planes: game.encode_planes(), probs, z });
            game.try_play(mv).unwrap();
        }
        out.truncate(n);
        out
    }

    fn flatten(samples: &[TrainingSample]) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
        (
            samples.iter().flat_map(|s| s.planes.clone()).collect(),
            samples.iter().flat_map(|s| s.probs.clone()).collect(),
            samples.iter().map(|s| s.z).collect(),
        )
    }

    fn tiny_config(dir: &Path) -> TrainerConfig {
        TrainerConfig {
            batch_size: 8,
            buffer_size: 200,
            epochs: 2,
            game_batch_num: 2,
            check_freq: 2,
            eval_games: 2,
            pure_mcts_playouts: 10,
            checkpoint_dir: dir.to_path_buf(),
            seed: Some(3),
            progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn training_steps_reduce_the_loss() {
        let mut learner = PolicyValueLearner::new(3, 3, 1e-4);
        let (planes, probs, z) = flatten(&tiny_samples(7));
        let first = learner.train_step(&planes, &probs, &z, 1e-2).unwrap();
        let mut last = first;
        for _ in 0..30 {
            last = learner.train_step(&planes, &probs, &z, 1e-2).unwrap();
        }
        assert!(first.loss.is_finite() && last.loss.is_finite());
        assert!(last.loss < first.loss, "{} -> {}", first.loss, last.loss);
        assert!(last.entropy > 0.0);
    }

    #[test]
    fn predictions_are_distributions() {
        let learner = PolicyValueLearner::new(3, 3, 1e-4);
        let (planes, _, _) = flatten(&tiny_samples(3));
        let (probs, values) = learner.predict(&planes).unwrap();
        assert_eq!(probs.len(), 27);
        assert_eq!(values.len(), 3);
        for row in probs.chunks(9) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn learner_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model");
        let learner = PolicyValueLearner::new(3, 3, 1e-4);
        learner.save(&path).unwrap();
        let mut other = PolicyValueLearner::new(3, 3, 1e-4);
        other.load_weights(&path).unwrap();
        let (planes, _, _) = flatten(&tiny_samples(2));
        let (a, va) = learner.predict(&planes).unwrap();
        let (b, vb) = other.predict(&planes).unwrap();
        assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-6));
        assert!(va.iter().zip(&vb).all(|(x, y)| (x - y).abs() < 1e-6));
    }

    #[test]
    fn lr_multiplier_follows_the_kl() {
        assert!((adapt_lr_multiplier(1.0, 0.1, 0.02) - 1.0 / 1.5).abs() < 1e-12);
        assert!((adapt_lr_multiplier(1.0, 0.001, 0.02) - 1.5).abs() < 1e-12);
        assert_eq!(adapt_lr_multiplier(1.0, 0.02, 0.02), 1.0);
        assert_eq!(adapt_lr_multiplier(0.05, 0.1, 0.02), 0.05);
        assert_eq!(adapt_lr_multiplier(12.0, 0.0, 0.02), 12.0);
    }

    #[test]
    fn kl_and_explained_variance() {
        let p = [0.5, 0.5, 1.0, 0.0];
        assert!(kl_divergence(&p, &p, 2).abs() < 1e-9);
        assert!(kl_divergence(&[1.0, 0.0], &[0.5, 0.5], 2) > 0.69);
        assert!((explained_variance(&[1.0, -1.0], &[1.0, -1.0]) - 1.0).abs() < 1e-9);
        assert!(explained_variance(&[1.0, -1.0], &[0.0, 0.0]).abs() < 1e-9);
        assert_eq!(explained_variance(&[1.0, 1.0], &[0.0, 0.5]), 0.0);
    }

    #[test]
    fn evaluation_keeps_the_best_ratio() {
        let config = TrainerConfig::default();
        let worse = record_evaluation(0.4, 0.5, 1000, &config);
        assert_eq!(worse, EvaluationOutcome { improved: false, best_win_ratio: 0.5, pure_mcts_playouts: 1000 });
        let tie = record_evaluation(0.5, 0.5, 1000, &config);
        assert!(!tie.improved);
        let better = record_evaluation(0.7, 0.5, 1000, &config);
        assert_eq!(better, EvaluationOutcome { improved: true, best_win_ratio: 0.7, pure_mcts_playouts: 1000 });
    }

    #[test]
    fn perfect_score_strengthens_the_opponent_up_to_the_cap() {
        let config = TrainerConfig::default();
        let raised = record_evaluation(1.0, 0.6, 1000, &config);
        assert_eq!(raised, EvaluationOutcome { improved: true, best_win_ratio: 0.0, pure_mcts_playouts: 2000 });
        let capped = record_evaluation(1.0, 0.6, 5000, &config);
        assert_eq!(capped, EvaluationOutcome { improved: true, best_win_ratio: 1.0, pure_mcts_playouts: 5000 });
    }

    #[test]
    fn large_policy_jumps_stop_the_epochs_early() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainerConfig { epochs: 5, kl_target: 1e-12, ..tiny_config(dir.path()) };
        let search = AlphaZeroConfig { n_playout: 5, ..Default::default() };
        let board = GomokuConfig { width: 3, height: 3, n_in_row: 3 };
        let mut trainer = Trainer::new(board, search, config).unwrap();
        trainer.collect_selfplay_data(1).unwrap();
        let stats = trainer.policy_update().unwrap();
        assert_eq!(stats.epochs_run, 1);
        assert!(stats.kl > 4e-12);
        // the jump is far above twice the target, so the rate shrinks
        assert!((stats.lr_multiplier - 1.0 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn small_policy_moves_run_every_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainerConfig { epochs: 3, kl_target: 1e6, ..tiny_config(dir.path()) };
        let search = AlphaZeroConfig { n_playout: 5, ..Default::default() };
        let board = GomokuConfig { width: 3, height: 3, n_in_row: 3 };
        let mut trainer = Trainer::new(board, search, config).unwrap();
        trainer.collect_selfplay_data(1).unwrap();
        let stats = trainer.policy_update().unwrap();
        assert_eq!(stats.epochs_run, 3);
        assert!((stats.lr_multiplier - 1.5).abs() < 1e-12);
    }

    #[test]
    fn replay_buffer_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainerConfig { buffer_size: 20, ..tiny_config(dir.path()) };
        let search = AlphaZeroConfig { n_playout: 5, ..Default::default() };
        let board = GomokuConfig { width: 3, height: 3, n_in_row: 3 };
        let mut trainer = Trainer::new(board, search, config).unwrap();
        trainer.collect_selfplay_data(3).unwrap();
        assert_eq!(trainer.buffer_len(), 20);
    }

    #[test]
    fn run_writes_checkpoints_and_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let search = AlphaZeroConfig { n_playout: 8, ..Default::default() };
        let board = GomokuConfig { width: 3, height: 3, n_in_row: 3 };
        let mut trainer = Trainer::new(board, search.clone(), tiny_config(dir.path())).unwrap();
        trainer.run().unwrap();
        assert!(dir.path().join("current_policy.mpk").exists());
        assert!(dir.path().join(STATE_FILE).exists());

        let resumed = Trainer::new(board, search, tiny_config(dir.path())).unwrap().resume(dir.path()).unwrap();
        assert_eq!(resumed.state(), trainer.state());
        assert_eq!(resumed.state().batches, 2);
    }
}
