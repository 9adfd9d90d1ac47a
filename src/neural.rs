//! Policy/value network for Gomoku and the evaluator that plugs it into MCTS.
//!
//! ```text
//! Input:   [batch, 4, height, width]
//! Trunk:   3x3 conv 4 -> 32 -> 64 -> 128, same padding, ReLU
//! Policy:  1x1 conv 128 -> 4, ReLU, linear 4*h*w -> h*w, log-softmax
//! Value:   1x1 conv 128 -> 2, ReLU, linear 2*h*w -> 64, ReLU, linear 64 -> 1, tanh
//! ```

use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use burn::tensor::activation::{log_softmax, tanh};
use burn::tensor::TensorData;

use crate::error::{CheckpointError, SearchError};
use crate::games::gomoku::{Gomoku, PLANES};
use crate::mcts::Evaluator;
use crate::utils::{Action, Game, Probability, Reward};

pub type InferBackend = NdArray<f32>;
pub type TrainBackend = Autodiff<InferBackend>;

/// Combined policy and value network
#[derive(Module, Debug)]
pub struct PolicyValueNet<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    policy_conv: Conv2d<B>,
    policy_fc: Linear<B>,
    value_conv: Conv2d<B>,
    value_fc1: Linear<B>,
    value_fc2: Linear<B>,
    relu: Relu,
}

impl<B: Backend> PolicyValueNet<B> {
    pub fn new(width: usize, height: usize, device: &B::Device) -> Self {
        let area = width * height;
        let conv3x3 = |c_in: usize, c_out: usize| -> Conv2d<B> {
            Conv2dConfig::new([c_in, c_out], [3, 3]).with_padding(PaddingConfig2d::Same).init(device)
        };
        Self {
            conv1: conv3x3(PLANES, 32),
            conv2: conv3x3(32, 64),
            conv3: conv3x3(64, 128),
            policy_conv: Conv2dConfig::new([128, 4], [1, 1]).init(device),
            policy_fc: LinearConfig::new(4 * area, area).init(device),
            value_conv: Conv2dConfig::new([128, 2], [1, 1]).init(device),
            value_fc1: LinearConfig::new(2 * area, 64).init(device),
            value_fc2: LinearConfig::new(64, 1).init(device),
            relu: Relu::new(),
        }
    }

    /// Forward pass returning (log move probabilities [batch, h*w], value [batch, 1])
    pub fn forward(&self, input: Tensor<B, 4>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, _, height, width] = input.dims();
        let area = height * width;

        let x = self.relu.forward(self.conv1.forward(input));
        let x = self.relu.forward(self.conv2.forward(x));
        let x = self.relu.forward(self.conv3.forward(x));

        let p = self.relu.forward(self.policy_conv.forward(x.clone()));
        let p = p.reshape([batch, 4 * area]);
        let log_probs = log_softmax(self.policy_fc.forward(p), 1);

        let v = self.relu.forward(self.value_conv.forward(x));
        let v = v.reshape([batch, 2 * area]);
        let v = self.relu.forward(self.value_fc1.forward(v));
        let value = tanh(self.value_fc2.forward(v));

        (log_probs, value)
    }

    /// Write the weights with burn's default recorder (the recorder adds the extension)
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        self.clone()
            .save_file(path.to_path_buf(), &DefaultRecorder::default())
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))
    }

    /// Fresh network for a `width` x `height` board with weights read from `path`
    pub fn load(path: &Path, width: usize, height: usize, device: &B::Device) -> Result<Self, CheckpointError> {
        Self::new(width, height, device)
            .load_file(path.to_path_buf(), &DefaultRecorder::default(), device)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))
    }
}

/// Stack flat `[4 * h * w]` plane encodings into a `[batch, 4, h, w]` tensor
pub fn planes_to_tensor<B: Backend>(flat: &[f32], height: usize, width: usize, device: &B::Device) -> Tensor<B, 4> {
    let batch = flat.len() / (PLANES * height * width);
    Tensor::<B, 1>::from_data(TensorData::from(flat), device).reshape([batch, PLANES, height, width])
}

/// Encode a batch of positions as seen by their players to move
pub fn encode_games<B: Backend>(games: &[&Gomoku], device: &B::Device) -> Option<Tensor<B, 4>> {
    let first = games.first()?;
    let flat: Vec<f32> = games.iter().flat_map(|g| g.encode_planes()).collect();
    Some(planes_to_tensor(&flat, first.height(), first.width(), device))
}

/// Network-backed leaf evaluation on the CPU inference backend
#[derive(Debug, Clone)]
pub struct NetworkEvaluator {
    net: PolicyValueNet<InferBackend>,
    device: <InferBackend as Backend>::Device,
}

impl NetworkEvaluator {
    pub fn new(net: PolicyValueNet<InferBackend>) -> Self {
        Self { net, device: Default::default() }
    }

    pub fn from_file(path: &Path, width: usize, height: usize) -> Result<Self, CheckpointError> {
        let device = Default::default();
        let net = PolicyValueNet::load(path, width, height, &device)?;
        Ok(Self { net, device })
    }
}

impl Evaluator<Gomoku> for NetworkEvaluator {
    fn evaluate(&mut self, game: &Gomoku) -> Result<(Vec<(Action, Probability)>, Reward), SearchError> {
        let input = planes_to_tensor::<InferBackend>(&game.encode_planes(), game.height(), game.width(), &self.device);
        let (log_probs, value) = self.net.forward(input);
        let log_probs: Vec<f32> =
            log_probs.into_data().to_vec().map_err(|e| SearchError::Evaluation(format!("{:?}", e)))?;
        let value: Vec<f32> = value.into_data().to_vec().map_err(|e| SearchError::Evaluation(format!("{:?}", e)))?;
        let priors = game.available_actions().into_iter().map(|a| (a, (log_probs[a] as f64).exp())).collect();
        Ok((priors, value.first().copied().unwrap_or(0.0) as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn output_shapes_follow_the_board() {
        let device = Default::default();
        let net = PolicyValueNet::<TestBackend>::new(6, 5, &device);
        let input = Tensor::<TestBackend, 4>::zeros([3, PLANES, 5, 6], &device);
        let (log_probs, value) = net.forward(input);
        assert_eq!(log_probs.shape().dims, [3, 30]);
        assert_eq!(value.shape().dims, [3, 1]);
    }

    #[test]
    fn policy_is_a_distribution_and_value_is_bounded() {
        let device = Default::default();
        let net = PolicyValueNet::<TestBackend>::new(4, 4, &device);
        let mut g = Gomoku::with_size(4, 4, 3).unwrap();
        g.try_play(5).unwrap();
        let (log_probs, value) = net.forward(encode_games(&[&g, &g], &device).unwrap());
        let probs: Vec<f32> = log_probs.exp().into_data().to_vec().unwrap();
        assert!((probs[..16].iter().sum::<f32>() - 1.0).abs() < 1e-4);
        let value: Vec<f32> = value.into_data().to_vec().unwrap();
        assert!(value.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn evaluator_only_scores_legal_moves() {
        let mut eval = NetworkEvaluator::new(PolicyValueNet::new(3, 3, &Default::default()));
        let mut g = Gomoku::with_size(3, 3, 3).unwrap();
        g.try_play(4).unwrap();
        let (priors, value) = eval.evaluate(&g).unwrap();
        assert_eq!(priors.len(), 8);
        assert!(priors.iter().all(|&(a, p)| a != 4 && p > 0.0));
        assert!(priors.iter().map(|&(_, p)| p).sum::<f64>() <= 1.0 + 1e-6);
        assert!((-1.0..=1.0).contains(&value));
    }

    #[test]
    fn weights_survive_a_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net");
        let device = Default::default();
        let net = PolicyValueNet::<TestBackend>::new(3, 3, &device);
        net.save(&path).unwrap();
        let loaded = PolicyValueNet::<TestBackend>::load(&path, 3, 3, &device).unwrap();

        let g = Gomoku::with_size(3, 3, 3).unwrap();
        let input = || encode_games::<TestBackend>(&[&g], &device).unwrap();
        let a: Vec<f32> = net.forward(input()).0.into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.forward(input()).0.into_data().to_vec().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }
}
