//! Action-value network `Q(s, a)`.
//!
//! States and actions enter through separate pathways that are summed before
//! the final layers:
//!
//! ```text
//! states  -> Dense -> BN -> ReLU -> Dense --+
//!                                           +-> Add -> BN -> ReLU -> Dense(1)
//! actions -> Dense -------------------------+
//! ```
//!
//! Besides regression towards TD targets, the critic supplies `dQ/da`, the
//! signal the actor is trained on.

use burn::module::AutodiffModule;
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig, Relu};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use super::{
    batch_rows, l2_penalty, maybe_batch_norm, tensor_to_scalar, tensor_to_vec, to_batch_tensor,
    LearningPhase, NetworkConfig,
};
use crate::error::{DdpgError, Result};

// ============================================================================
// Configuration
// ============================================================================

/// Shape and hyperparameters of a critic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticConfig {
    pub state_size: usize,
    pub action_size: usize,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl CriticConfig {
    pub fn new(state_size: usize, action_size: usize) -> Self {
        Self {
            state_size,
            action_size,
            network: NetworkConfig::default(),
        }
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.state_size == 0 || self.action_size == 0 {
            return Err(DdpgError::Config(
                "critic state_size and action_size must be positive".to_string(),
            ));
        }
        self.network.validate("critic")
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Critic<B> {
        let hidden = self.network.hidden_size;
        let bn = |size: usize| {
            self.network
                .use_batchnorm
                .then(|| BatchNormConfig::new(size).init(device))
        };

        Critic {
            state_fc1: LinearConfig::new(self.state_size, hidden).init(device),
            state_bn: bn(hidden),
            state_fc2: LinearConfig::new(hidden, hidden).init(device),
            action_fc: LinearConfig::new(self.action_size, hidden).init(device),
            merge_bn: bn(hidden),
            q_out: LinearConfig::new(hidden, 1).init(device),
            activation: Relu::new(),
        }
    }
}

// ============================================================================
// Module
// ============================================================================

#[derive(Module, Debug)]
pub struct Critic<B: Backend> {
    state_fc1: Linear<B>,
    state_bn: Option<BatchNorm<B>>,
    state_fc2: Linear<B>,
    action_fc: Linear<B>,
    merge_bn: Option<BatchNorm<B>>,
    q_out: Linear<B>,
    activation: Relu,
}

impl<B: Backend> Critic<B> {
    /// `[batch, state_size] x [batch, action_size] -> [batch, 1]`
    pub fn forward(
        &self,
        states: Tensor<B, 2>,
        actions: Tensor<B, 2>,
        phase: LearningPhase,
    ) -> Tensor<B, 2> {
        let s = self.state_fc1.forward(states);
        let s = self.activation.forward(maybe_batch_norm(&self.state_bn, s, phase));
        let s = self.state_fc2.forward(s);

        let a = self.action_fc.forward(actions);

        let merged = maybe_batch_norm(&self.merge_bn, s + a, phase);
        self.q_out.forward(self.activation.forward(merged))
    }

    pub fn l2_penalty(&self, l2: f32) -> Tensor<B, 1> {
        l2_penalty(
            &[&self.state_fc1, &self.state_fc2, &self.action_fc, &self.q_out],
            l2,
        )
    }
}

// ============================================================================
// Trainer
// ============================================================================

/// Online critic together with its optimizer.
pub struct CriticNetwork<B: AutodiffBackend> {
    model: Critic<B>,
    optimizer: OptimizerAdaptor<Adam, Critic<B>, B>,
    config: CriticConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> CriticNetwork<B> {
    pub fn new(config: CriticConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let model = config.init::<B>(device);
        let optimizer = config.network.optimizer_config().init();

        Ok(Self {
            model,
            optimizer,
            config,
            device: device.clone(),
        })
    }

    pub fn config(&self) -> &CriticConfig {
        &self.config
    }

    pub fn model(&self) -> &Critic<B> {
        &self.model
    }

    pub fn set_model(&mut self, model: Critic<B>) {
        self.model = model;
    }

    /// Build state and action tensors, checking both batches have the same rows.
    fn batch<BB: Backend>(
        &self,
        states: &[f32],
        actions: &[f32],
        device: &BB::Device,
    ) -> Result<(Tensor<BB, 2>, Tensor<BB, 2>)> {
        let rows = batch_rows("states", states, self.config.state_size)?;
        let action_rows = batch_rows("actions", actions, self.config.action_size)?;
        if rows != action_rows {
            return Err(DdpgError::BatchMismatch {
                name: "actions",
                expected: rows,
                actual: action_rows,
            });
        }
        Ok((
            to_batch_tensor::<BB>("states", states, self.config.state_size, device)?,
            to_batch_tensor::<BB>("actions", actions, self.config.action_size, device)?,
        ))
    }

    /// Q-values for a batch of state-action pairs, one per row.
    pub fn predict(&self, states: &[f32], actions: &[f32]) -> Result<Vec<f32>> {
        let (states, actions) = self.batch::<B::InnerBackend>(states, actions, &self.device)?;
        tensor_to_vec(
            self.model
                .valid()
                .forward(states, actions, LearningPhase::Inference),
        )
    }

    /// One Adam step on `MSE(Q(s, a), q_targets) + l2 * ΣW²`.
    ///
    /// Returns the loss before the step.
    pub fn train_on_batch(
        &mut self,
        states: &[f32],
        actions: &[f32],
        q_targets: &[f32],
    ) -> Result<f32> {
        let (states, actions) = self.batch::<B>(states, actions, &self.device)?;
        let [rows, _] = states.dims();
        if q_targets.len() != rows {
            return Err(DdpgError::BatchMismatch {
                name: "q_targets",
                expected: rows,
                actual: q_targets.len(),
            });
        }
        let targets = to_batch_tensor::<B>("q_targets", q_targets, 1, &self.device)?;

        let q = self.model.forward(states, actions, LearningPhase::Train);
        let mse = (q - targets).powf_scalar(2.0).mean();
        let loss = mse + self.model.l2_penalty(self.config.network.l2);
        let loss_value = tensor_to_scalar(loss.clone())?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optimizer.step(
            self.config.network.learning_rate,
            self.model.clone(),
            grads,
        );

        Ok(loss_value)
    }

    /// `dQ/da` for every row, flattened row-major with `action_size` columns.
    ///
    /// Batch normalization runs on its running statistics, so each row's
    /// gradient depends only on that row.
    pub fn get_action_gradients(&self, states: &[f32], actions: &[f32]) -> Result<Vec<f32>> {
        let (states, actions) = self.batch::<B>(states, actions, &self.device)?;
        let actions = actions.require_grad();

        let q = self
            .model
            .forward(states, actions.clone(), LearningPhase::Inference);
        let grads = q.sum().backward();

        let action_grads = actions.grad(&grads).ok_or(DdpgError::MissingGradient)?;
        tensor_to_vec(action_grads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn config(batchnorm: bool) -> CriticConfig {
        CriticConfig::new(3, 2).with_network(
            NetworkConfig::default()
                .with_hidden_size(16)
                .with_batchnorm(batchnorm),
        )
    }

    #[test]
    fn test_predict_one_value_per_row() {
        let device = Default::default();
        let critic = CriticNetwork::<TestBackend>::new(config(true), &device).unwrap();
        let q = critic.predict(&[0.1; 12], &[0.5; 8]).unwrap();
        assert_eq!(q.len(), 4);
        assert!(q.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_action_gradient_shape() {
        let device = Default::default();
        let critic = CriticNetwork::<TestBackend>::new(config(true), &device).unwrap();
        let grads = critic
            .get_action_gradients(&[0.3; 15], &[1.0, -1.0, 0.5, 0.2, 0.0, 0.0, 2.0, 1.0, -0.5, 0.3])
            .unwrap();
        assert_eq!(grads.len(), 10);
        assert!(grads.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn test_action_gradients_match_finite_differences() {
        let device = Default::default();
        let critic = CriticNetwork::<TestBackend>::new(config(false), &device).unwrap();

        let states = [0.2, -0.4, 0.7];
        let actions = [0.3, -0.1];
        let grads = critic.get_action_gradients(&states, &actions).unwrap();

        let eps = 1e-3;
        for i in 0..2 {
            let mut plus = actions;
            let mut minus = actions;
            plus[i] += eps;
            minus[i] -= eps;
            let q_plus = critic.predict(&states, &plus).unwrap()[0];
            let q_minus = critic.predict(&states, &minus).unwrap()[0];
            let numeric = (q_plus - q_minus) / (2.0 * eps);
            assert!(
                (numeric - grads[i]).abs() < 1e-2,
                "dim {}: numeric {} vs analytic {}",
                i,
                numeric,
                grads[i]
            );
        }
    }

    #[test]
    fn test_action_gradients_are_per_sample() {
        let device = Default::default();
        let critic = CriticNetwork::<TestBackend>::new(config(true), &device).unwrap();

        let single = critic.get_action_gradients(&[0.1, 0.2, 0.3], &[0.4, 0.5]).unwrap();
        let batch = critic
            .get_action_gradients(&[0.1, 0.2, 0.3, 5.0, -5.0, 2.0], &[0.4, 0.5, -3.0, 3.0])
            .unwrap();
        assert!((single[0] - batch[0]).abs() < 1e-5);
        assert!((single[1] - batch[1]).abs() < 1e-5);
    }

    #[test]
    fn test_train_on_batch_reduces_loss() {
        let device = Default::default();
        let network = NetworkConfig::default()
            .with_hidden_size(16)
            .with_batchnorm(false)
            .with_l2(0.0)
            .with_learning_rate(1e-2);
        let mut critic =
            CriticNetwork::<TestBackend>::new(CriticConfig::new(3, 2).with_network(network), &device)
                .unwrap();

        let states: Vec<f32> = (0..24).map(|i| (i % 5) as f32 * 0.2).collect();
        let actions: Vec<f32> = (0..16).map(|i| (i % 3) as f32 * 0.5).collect();
        let targets = vec![1.0; 8];

        let first = critic.train_on_batch(&states, &actions, &targets).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = critic.train_on_batch(&states, &actions, &targets).unwrap();
        }
        assert!(last < first, "loss {} -> {}", first, last);
    }

    #[test]
    fn test_train_on_batch_with_grad_clipping() {
        let device = Default::default();
        let network = NetworkConfig::default()
            .with_hidden_size(8)
            .with_grad_clip_value(Some(0.5));
        let mut critic =
            CriticNetwork::<TestBackend>::new(CriticConfig::new(3, 2).with_network(network), &device)
                .unwrap();
        let loss = critic
            .train_on_batch(&[0.1; 6], &[0.2; 4], &[100.0, -100.0])
            .unwrap();
        assert!(loss.is_finite());
    }

    #[test]
    fn test_rejects_mismatched_targets() {
        let device = Default::default();
        let mut critic = CriticNetwork::<TestBackend>::new(config(true), &device).unwrap();
        let result = critic.train_on_batch(&[0.0; 6], &[0.0; 4], &[0.0; 3]);
        assert!(matches!(
            result,
            Err(DdpgError::BatchMismatch { name: "q_targets", expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_rejects_mismatched_actions() {
        let device = Default::default();
        let critic = CriticNetwork::<TestBackend>::new(config(true), &device).unwrap();
        let result = critic.get_action_gradients(&[0.0; 6], &[0.0; 6]);
        assert!(matches!(
            result,
            Err(DdpgError::BatchMismatch { name: "actions", expected: 2, actual: 3 })
        ));
    }
}
