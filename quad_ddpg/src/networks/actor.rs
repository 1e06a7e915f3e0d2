//! Deterministic policy network: state -> rotor speeds.
//!
//! Topology: `Dense -> BN -> ReLU -> Dense -> BN -> ReLU -> Dense -> tanh`,
//! followed by an affine map of `(-1, 1)` onto `[action_low, action_high]`.
//!
//! The actor is not trained on a loss of its own. The agent hands it
//! `dQ/da` from the critic and the actor ascends along it by minimizing
//! `mean(-dQ/da * a) + l2 * ΣW²`.

use burn::module::AutodiffModule;
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig, Relu};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::activation::tanh;
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

/// Shape and hyperparameters of an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    pub state_size: usize,
    pub action_size: usize,
    pub action_low: f32,
    pub action_high: f32,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl ActorConfig {
    pub fn new(state_size: usize, action_size: usize, action_low: f32, action_high: f32) -> Self {
        Self {
            state_size,
            action_size,
            action_low,
            action_high,
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
                "actor state_size and action_size must be positive".to_string(),
            ));
        }
        if !(self.action_high > self.action_low) {
            return Err(DdpgError::Config(format!(
                "actor action_high ({}) must exceed action_low ({})",
                self.action_high, self.action_low
            )));
        }
        self.network.validate("actor")
    }

    /// Build the module with freshly initialized weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Actor<B> {
        let hidden = self.network.hidden_size;
        let bn = |size: usize| {
            self.network
                .use_batchnorm
                .then(|| BatchNormConfig::new(size).init(device))
        };

        Actor {
            fc1: LinearConfig::new(self.state_size, hidden).init(device),
            bn1: bn(hidden),
            fc2: LinearConfig::new(hidden, hidden).init(device),
            bn2: bn(hidden),
            out: LinearConfig::new(hidden, self.action_size).init(device),
            activation: Relu::new(),
            action_low: self.action_low,
            action_range: self.action_high - self.action_low,
        }
    }
}

// ============================================================================
// Module
// ============================================================================

#[derive(Module, Debug)]
pub struct Actor<B: Backend> {
    fc1: Linear<B>,
    bn1: Option<BatchNorm<B>>,
    fc2: Linear<B>,
    bn2: Option<BatchNorm<B>>,
    out: Linear<B>,
    activation: Relu,
    #[module(skip)]
    action_low: f32,
    #[module(skip)]
    action_range: f32,
}

impl<B: Backend> Actor<B> {
    /// Map `[batch, state_size]` to `[batch, action_size]` in `[low, high]`.
    pub fn forward(&self, states: Tensor<B, 2>, phase: LearningPhase) -> Tensor<B, 2> {
        let x = self.fc1.forward(states);
        let x = self.activation.forward(maybe_batch_norm(&self.bn1, x, phase));
        let x = self.fc2.forward(x);
        let x = self.activation.forward(maybe_batch_norm(&self.bn2, x, phase));

        // (-1, 1) -> (0, 1) -> [low, high]
        let squashed = tanh(self.out.forward(x));
        squashed
            .add_scalar(1.0)
            .mul_scalar(0.5 * self.action_range)
            .add_scalar(self.action_low)
    }

    /// Kernel penalty over all dense layers.
    pub fn l2_penalty(&self, l2: f32) -> Tensor<B, 1> {
        l2_penalty(&[&self.fc1, &self.fc2, &self.out], l2)
    }

    pub fn action_low(&self) -> f32 {
        self.action_low
    }

    pub fn action_high(&self) -> f32 {
        self.action_low + self.action_range
    }
}

// ============================================================================
// Trainer
// ============================================================================

/// Online actor together with its optimizer.
pub struct ActorNetwork<B: AutodiffBackend> {
    model: Actor<B>,
    optimizer: OptimizerAdaptor<Adam, Actor<B>, B>,
    config: ActorConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> ActorNetwork<B> {
    pub fn new(config: ActorConfig, device: &B::Device) -> Result<Self> {
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

    pub fn config(&self) -> &ActorConfig {
        &self.config
    }

    pub fn model(&self) -> &Actor<B> {
        &self.model
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Swap in weights loaded from disk. The optimizer state is kept.
    pub fn set_model(&mut self, model: Actor<B>) {
        self.model = model;
    }

    /// Deterministic actions for a flat batch of states, running statistics
    /// in batch normalization.
    pub fn predict(&self, states: &[f32]) -> Result<Vec<f32>> {
        let states = to_batch_tensor::<B::InnerBackend>(
            "states",
            states,
            self.config.state_size,
            &self.device,
        )?;
        tensor_to_vec(self.model.valid().forward(states, LearningPhase::Inference))
    }

    /// One gradient step along the critic's action gradients.
    ///
    /// `action_gradients` holds `dQ/da` for each row of `states`, flattened
    /// row-major with `action_size` columns. Returns the loss before the step.
    pub fn train(&mut self, states: &[f32], action_gradients: &[f32]) -> Result<f32> {
        let rows = batch_rows("states", states, self.config.state_size)?;
        let grad_rows = batch_rows("action_gradients", action_gradients, self.config.action_size)?;
        if rows != grad_rows {
            return Err(DdpgError::BatchMismatch {
                name: "action_gradients",
                expected: rows,
                actual: grad_rows,
            });
        }

        let states = to_batch_tensor::<B>("states", states, self.config.state_size, &self.device)?;
        let action_gradients = to_batch_tensor::<B>(
            "action_gradients",
            action_gradients,
            self.config.action_size,
            &self.device,
        )?;

        let actions = self.model.forward(states, LearningPhase::Train);
        let loss = actions.mul(action_gradients).neg().mean()
            + self.model.l2_penalty(self.config.network.l2);
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn small_config() -> ActorConfig {
        ActorConfig::new(6, 2, 0.0, 500.0)
            .with_network(NetworkConfig::default().with_hidden_size(16))
    }

    #[test]
    fn test_predict_stays_in_action_range() {
        let device = Default::default();
        let actor = ActorNetwork::<TestBackend>::new(small_config(), &device).unwrap();

        let states: Vec<f32> = (0..18).map(|i| (i as f32 - 9.0) * 10.0).collect();
        let actions = actor.predict(&states).unwrap();

        assert_eq!(actions.len(), 6);
        for a in actions {
            assert!((0.0..=500.0).contains(&a), "action {} out of range", a);
        }
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let device = Default::default();
        let actor = ActorNetwork::<TestBackend>::new(small_config(), &device).unwrap();
        assert!(matches!(
            actor.predict(&[0.0; 7]),
            Err(DdpgError::BatchShape { name: "states", .. })
        ));
    }

    #[test]
    fn test_invalid_action_range_rejected() {
        let device = Default::default();
        let config = ActorConfig::new(6, 2, 1.0, 1.0);
        assert!(ActorNetwork::<TestBackend>::new(config, &device).is_err());
    }

    #[test]
    fn test_train_follows_action_gradients() {
        let device = Default::default();
        let network = NetworkConfig::default()
            .with_hidden_size(16)
            .with_l2(0.0)
            .with_batchnorm(false)
            .with_learning_rate(1e-2);
        let config = small_config().with_network(network);
        let mut actor = ActorNetwork::<TestBackend>::new(config, &device).unwrap();

        let states: Vec<f32> = (0..24).map(|i| ((i * 7) % 11) as f32 * 0.1).collect();
        // Push the first action dimension up, leave the second alone
        let grads: Vec<f32> = (0..4).flat_map(|_| [1.0, 0.0]).collect();

        let before = actor.predict(&states).unwrap();
        for _ in 0..20 {
            actor.train(&states, &grads).unwrap();
        }
        let after = actor.predict(&states).unwrap();

        let mean_first = |v: &[f32]| v.iter().step_by(2).sum::<f32>() / 4.0;
        assert!(mean_first(&after) > mean_first(&before));
    }

    #[test]
    fn test_train_rejects_mismatched_rows() {
        let device = Default::default();
        let mut actor = ActorNetwork::<TestBackend>::new(small_config(), &device).unwrap();
        let result = actor.train(&[0.0; 12], &[0.0; 6]);
        assert!(matches!(
            result,
            Err(DdpgError::BatchMismatch { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn test_without_batchnorm() {
        let device = Default::default();
        let config = small_config()
            .with_network(NetworkConfig::default().with_hidden_size(8).with_batchnorm(false));
        let mut actor = ActorNetwork::<TestBackend>::new(config, &device).unwrap();
        let states = vec![0.5; 12];
        let loss = actor.train(&states, &[0.1; 4]).unwrap();
        assert!(loss.is_finite());
    }
}
