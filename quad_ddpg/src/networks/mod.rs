//! Actor and critic networks.
//!
//! Both networks are plain burn modules ([`Actor`], [`Critic`]) wrapped in a
//! trainer ([`ActorNetwork`], [`CriticNetwork`]) that owns the Adam optimizer
//! and exposes the slice-in / slice-out operations the agent calls.
//!
//! # Learning phase
//!
//! Batch normalization behaves differently while training (batch statistics,
//! running statistics updated) and at inference (running statistics). burn
//! picks the mode from the backend, which is not enough here: the critic's
//! action gradients must be taken through the autodiff backend while batch
//! norm uses its running statistics. [`LearningPhase`] makes the choice
//! explicit on every forward pass.

pub mod actor;
pub mod critic;

pub use actor::{Actor, ActorConfig, ActorNetwork};
pub use critic::{Critic, CriticConfig, CriticNetwork};

use burn::grad_clipping::GradientClippingConfig;
use burn::nn::{BatchNorm, Linear};
use burn::optim::AdamConfig;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DdpgError, Result};

/// Selects how batch normalization layers normalize their input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningPhase {
    /// Batch statistics; running statistics are updated.
    Train,
    /// Running statistics only.
    Inference,
}

/// Hyperparameters shared by the actor and the critic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Width of the hidden layers
    pub hidden_size: usize,
    /// L2 coefficient on dense kernels (biases excluded)
    pub l2: f32,
    /// Insert batch normalization after the hidden layers
    pub use_batchnorm: bool,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Clip each gradient component to `[-v, v]` before the Adam step
    pub grad_clip_value: Option<f32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_size: 200,
            l2: 0.01,
            use_batchnorm: true,
            learning_rate: 1e-3,
            grad_clip_value: None,
        }
    }
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_l2(mut self, l2: f32) -> Self {
        self.l2 = l2;
        self
    }

    pub fn with_batchnorm(mut self, enabled: bool) -> Self {
        self.use_batchnorm = enabled;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_grad_clip_value(mut self, clip: Option<f32>) -> Self {
        self.grad_clip_value = clip;
        self
    }

    /// Check ranges.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.hidden_size == 0 {
            return Err(DdpgError::Config(format!("{}.hidden_size must be positive", name)));
        }
        if self.l2 < 0.0 {
            return Err(DdpgError::Config(format!("{}.l2 must be non-negative", name)));
        }
        if !(self.learning_rate > 0.0) {
            return Err(DdpgError::Config(format!("{}.learning_rate must be positive", name)));
        }
        if let Some(clip) = self.grad_clip_value {
            if !(clip > 0.0) {
                return Err(DdpgError::Config(format!(
                    "{}.grad_clip_value must be positive",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Adam settings for this network.
    pub(crate) fn optimizer_config(&self) -> AdamConfig {
        let config = AdamConfig::new();
        match self.grad_clip_value {
            Some(v) => config.with_grad_clipping(Some(GradientClippingConfig::Value(v))),
            None => config,
        }
    }
}

// ============================================================================
// Layer helpers
// ============================================================================

/// Apply batch normalization to a `[batch, features]` tensor in the given phase.
pub(crate) fn batch_norm<B: Backend>(
    norm: &BatchNorm<B>,
    x: Tensor<B, 2>,
    phase: LearningPhase,
) -> Tensor<B, 2> {
    match phase {
        LearningPhase::Train => norm.forward(x),
        LearningPhase::Inference => {
            let [_, features] = x.dims();
            let mean = norm.running_mean.value().reshape([1, features]);
            let var = norm.running_var.value().reshape([1, features]);
            let std = var.add_scalar(norm.epsilon).sqrt();
            let gamma = norm.gamma.val().reshape([1, features]);
            let beta = norm.beta.val().reshape([1, features]);

            x.sub(mean).div(std).mul(gamma).add(beta)
        }
    }
}

/// Optional batch normalization: identity when the layer is absent.
pub(crate) fn maybe_batch_norm<B: Backend>(
    norm: &Option<BatchNorm<B>>,
    x: Tensor<B, 2>,
    phase: LearningPhase,
) -> Tensor<B, 2> {
    match norm {
        Some(norm) => batch_norm(norm, x, phase),
        None => x,
    }
}

/// `l2 * Σ W²` over the kernels of the given layers.
pub(crate) fn l2_penalty<B: Backend>(layers: &[&Linear<B>], l2: f32) -> Tensor<B, 1> {
    let device = layers
        .first()
        .map(|l| l.weight.val().device())
        .unwrap_or_default();
    let mut total = Tensor::<B, 1>::zeros([1], &device);
    for layer in layers {
        total = total + layer.weight.val().powf_scalar(2.0).sum();
    }
    total.mul_scalar(l2)
}

// ============================================================================
// Tensor conversion
// ============================================================================

/// Number of rows in a flat row-major batch, checking the width divides it.
pub(crate) fn batch_rows(name: &'static str, data: &[f32], width: usize) -> Result<usize> {
    if width == 0 || data.len() % width != 0 {
        return Err(DdpgError::BatchShape {
            name,
            len: data.len(),
            width,
        });
    }
    Ok(data.len() / width)
}

/// Build a `[rows, width]` tensor from a flat row-major slice.
pub(crate) fn to_batch_tensor<B: Backend>(
    name: &'static str,
    data: &[f32],
    width: usize,
    device: &B::Device,
) -> Result<Tensor<B, 2>> {
    let rows = batch_rows(name, data, width)?;
    Ok(Tensor::<B, 1>::from_floats(data, device).reshape([rows, width]))
}

/// Read a tensor back into a flat row-major `Vec<f32>`.
pub(crate) fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| DdpgError::Tensor(format!("{:?}", e)))
}

/// Read a single-element tensor.
pub(crate) fn tensor_to_scalar<B: Backend>(tensor: Tensor<B, 1>) -> Result<f32> {
    tensor_to_vec(tensor)?
        .first()
        .copied()
        .ok_or_else(|| DdpgError::Tensor("expected a scalar tensor".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::module::RunningState;
    use burn::nn::{BatchNormConfig, LinearConfig};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_inference_batch_norm_uses_running_stats() {
        let device = Default::default();
        let mut norm = BatchNormConfig::new(2).init::<TestBackend>(&device);
        norm.running_mean = RunningState::new(Tensor::from_floats([1.0, -1.0], &device));
        norm.running_var = RunningState::new(Tensor::from_floats([4.0, 1.0], &device));

        let x = Tensor::<TestBackend, 2>::from_floats([[3.0, 0.0], [1.0, 1.0]], &device);
        let out = tensor_to_vec(batch_norm(&norm, x, LearningPhase::Inference)).unwrap();

        // (x - mean) / sqrt(var + eps), gamma = 1, beta = 0
        let expected = [1.0, 1.0, 0.0, 2.0];
        for (o, e) in out.iter().zip(expected.iter()) {
            assert!((o - e).abs() < 1e-3, "got {:?}", out);
        }
    }

    #[test]
    fn test_inference_batch_norm_is_per_sample() {
        let device = Default::default();
        let norm = BatchNormConfig::new(3).init::<TestBackend>(&device);

        let batch = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            &device,
        );
        let single = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0, 3.0]], &device);

        let batch_out = tensor_to_vec(batch_norm(&norm, batch, LearningPhase::Inference)).unwrap();
        let single_out = tensor_to_vec(batch_norm(&norm, single, LearningPhase::Inference)).unwrap();
        for i in 0..3 {
            assert!((batch_out[i] - single_out[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_l2_penalty_matches_manual_sum() {
        let device = Default::default();
        let layer = LinearConfig::new(3, 2).init::<TestBackend>(&device);
        let weights = tensor_to_vec(layer.weight.val()).unwrap();
        let manual: f32 = weights.iter().map(|w| w * w).sum::<f32>() * 0.01;

        let penalty = tensor_to_scalar(l2_penalty(&[&layer], 0.01)).unwrap();
        assert!((penalty - manual).abs() < 1e-5);
    }

    #[test]
    fn test_to_batch_tensor_rejects_ragged_input() {
        let device = Default::default();
        let result = to_batch_tensor::<TestBackend>("states", &[1.0, 2.0, 3.0], 2, &device);
        assert!(matches!(result, Err(DdpgError::BatchShape { len: 3, width: 2, .. })));
    }

    #[test]
    fn test_network_config_validation() {
        assert!(NetworkConfig::default().validate("actor").is_ok());
        assert!(NetworkConfig::default().with_hidden_size(0).validate("actor").is_err());
        assert!(NetworkConfig::default()
            .with_grad_clip_value(Some(-1.0))
            .validate("critic")
            .is_err());
    }
}
