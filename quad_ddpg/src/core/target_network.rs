//! Target network tracking by Polyak averaging.
//!
//! ```text
//! θ_target = τ · θ_online + (1 − τ) · θ_target
//! ```
//!
//! Tensors are paired by module traversal order, so the online and target
//! networks only need the same architecture, not the same parameter ids.
//! Every float tensor the module visits is blended, including batch-norm
//! running statistics.

use burn::module::{Module, ModuleMapper, Param};
use burn::prelude::*;

/// A visited tensor flattened to rank 1 so tensors of any rank share a `Vec`.
struct Flattened<B: Backend> {
    tensor: Tensor<B, 1>,
}

/// Collects the online network's tensors in traversal order.
struct Collector<B: Backend> {
    tensors: Vec<Flattened<B>>,
}

impl<B: Backend> ModuleMapper<B> for Collector<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let value = param.val();
        let numel: usize = value.dims().iter().product();
        self.tensors.push(Flattened {
            tensor: value.reshape([numel]),
        });
        param
    }
}

/// Blends each target tensor towards its online counterpart.
struct Blender<B: Backend> {
    online: Vec<Flattened<B>>,
    tau: f32,
    index: usize,
}

impl<B: Backend> ModuleMapper<B> for Blender<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let idx = self.index;
        self.index += 1;

        let Some(online) = self.online.get(idx) else {
            return param;
        };

        let target = param.val();
        let shape = target.dims();
        let numel: usize = shape.iter().product();
        if online.tensor.dims()[0] != numel {
            log::warn!(
                "soft update skipped tensor {}: online has {} elements, target {}",
                idx,
                online.tensor.dims()[0],
                numel
            );
            return param;
        }

        let blended = online.tensor.clone().mul_scalar(self.tau)
            + target.reshape([numel]).mul_scalar(1.0 - self.tau);
        Param::initialized(param.id.clone(), blended.reshape(shape))
    }
}

/// Move `target` a fraction `tau` of the way towards `online`.
///
/// `tau` is clamped to `[0, 1]`; `1` returns a copy of `online` and `0`
/// returns `target` untouched.
pub fn soft_update<B, M>(online: &M, target: M, tau: f32) -> M
where
    B: Backend,
    M: Module<B>,
{
    let tau = tau.clamp(0.0, 1.0);
    if tau >= 1.0 - 1e-6 {
        return online.clone();
    }
    if tau <= 1e-6 {
        return target;
    }

    let mut collector = Collector {
        tensors: Vec::new(),
    };
    let _ = online.clone().map(&mut collector);

    let mut blender = Blender {
        online: collector.tensors,
        tau,
        index: 0,
    };
    target.map(&mut blender)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::{ActorConfig, CriticConfig, LearningPhase, NetworkConfig};
    use burn::backend::NdArray;
    use burn::module::RunningState;
    use burn::nn::{BatchNormConfig, LinearConfig};

    type TestBackend = NdArray<f32>;

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_tau_zero_keeps_target() {
        let device = Default::default();
        let online = LinearConfig::new(4, 3).init::<TestBackend>(&device);
        let target = LinearConfig::new(4, 3).init::<TestBackend>(&device);
        let before = values(target.weight.val());

        let updated = soft_update::<TestBackend, _>(&online, target, 0.0);
        assert_eq!(values(updated.weight.val()), before);
    }

    #[test]
    fn test_tau_one_copies_online() {
        let device = Default::default();
        let online = LinearConfig::new(4, 3).init::<TestBackend>(&device);
        let target = LinearConfig::new(4, 3).init::<TestBackend>(&device);

        let updated = soft_update::<TestBackend, _>(&online, target, 1.0);
        assert_eq!(values(updated.weight.val()), values(online.weight.val()));
    }

    #[test]
    fn test_blends_weights_and_biases() {
        let device = Default::default();
        let online = LinearConfig::new(5, 2).init::<TestBackend>(&device);
        let target = LinearConfig::new(5, 2).init::<TestBackend>(&device);

        let ow = values(online.weight.val());
        let tw = values(target.weight.val());
        let ob = values(online.bias.as_ref().unwrap().val());
        let tb = values(target.bias.as_ref().unwrap().val());

        let tau = 0.01;
        let updated = soft_update::<TestBackend, _>(&online, target, tau);

        for (i, u) in values(updated.weight.val()).iter().enumerate() {
            let expected = tau * ow[i] + (1.0 - tau) * tw[i];
            assert!((u - expected).abs() < 1e-6);
        }
        for (i, u) in values(updated.bias.unwrap().val()).iter().enumerate() {
            let expected = tau * ob[i] + (1.0 - tau) * tb[i];
            assert!((u - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_blends_batch_norm_running_stats() {
        let device = Default::default();
        let mut online = BatchNormConfig::new(2).init::<TestBackend>(&device);
        online.running_mean = RunningState::new(Tensor::from_floats([2.0, 4.0], &device));
        let target = BatchNormConfig::new(2).init::<TestBackend>(&device);

        let updated = soft_update::<TestBackend, _>(&online, target, 0.5);
        let mean = values(updated.running_mean.value());
        assert!((mean[0] - 1.0).abs() < 1e-6);
        assert!((mean[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_repeated_updates_converge_to_online_actor() {
        let device = Default::default();
        let config = ActorConfig::new(6, 4, 0.0, 500.0)
            .with_network(NetworkConfig::default().with_hidden_size(8));
        let online = config.init::<TestBackend>(&device);
        let mut target = config.init::<TestBackend>(&device);

        for _ in 0..400 {
            target = soft_update::<TestBackend, _>(&online, target, 0.05);
        }

        let states = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.2, 10.0, 0.0, 0.0, 0.3]], &device);
        let a = values(online.forward(states.clone(), LearningPhase::Inference));
        let b = values(target.forward(states, LearningPhase::Inference));
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-2, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_critic_update_preserves_shapes() {
        let device = Default::default();
        let config = CriticConfig::new(18, 4).with_network(NetworkConfig::default().with_hidden_size(8));
        let online = config.init::<TestBackend>(&device);
        let target = config.init::<TestBackend>(&device);

        let updated = soft_update::<TestBackend, _>(&online, target, 0.3);
        assert_eq!(updated.num_params(), online.num_params());
    }
}
