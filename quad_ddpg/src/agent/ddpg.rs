//! Deep Deterministic Policy Gradient agent.
//!
//! # Update
//!
//! For a uniformly sampled batch `(s, a, r, s', d)`:
//!
//! ```text
//! a' = μ_target(s')
//! y  = r + γ · Q_target(s', a') · (1 − d)
//! critic:  minimize (Q(s, a) − y)²
//! actor:   ascend dQ/da evaluated at (s, a)
//! targets: θ' ← τθ + (1 − τ)θ'
//! ```
//!
//! Target networks live on the inner (non-autodiff) backend and always run
//! batch normalization on running statistics.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::config::{DDPGConfig, TrainingConfig};
use crate::core::{soft_update, Experience, ExperienceBatch, OUNoise, ReplayBuffer};
use crate::error::{DdpgError, Result};
use crate::networks::{
    to_batch_tensor, tensor_to_vec, Actor, ActorConfig, ActorNetwork, Critic, CriticConfig,
    CriticNetwork, LearningPhase,
};

/// Losses and value estimates from one learning step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LearnStats {
    pub critic_loss: f32,
    pub actor_loss: f32,
    /// Mean TD target of the batch
    pub mean_q_target: f32,
}

pub struct DDPGAgent<B: AutodiffBackend> {
    config: DDPGConfig,
    actor: ActorNetwork<B>,
    actor_target: Actor<B::InnerBackend>,
    critic: CriticNetwork<B>,
    critic_target: Critic<B::InnerBackend>,
    memory: ReplayBuffer,
    noise: OUNoise,
    rng: StdRng,
    last_state: Option<Vec<f32>>,
    learn_steps: usize,
    device: B::Device,
}

impl<B: AutodiffBackend> DDPGAgent<B> {
    pub fn new(
        config: DDPGConfig,
        actor_config: ActorConfig,
        critic_config: CriticConfig,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate()?;
        if actor_config.state_size != critic_config.state_size
            || actor_config.action_size != critic_config.action_size
        {
            return Err(DdpgError::Config(format!(
                "actor ({} -> {}) and critic ({} x {}) disagree on dimensions",
                actor_config.state_size,
                actor_config.action_size,
                critic_config.state_size,
                critic_config.action_size
            )));
        }

        let action_size = actor_config.action_size;
        let actor = ActorNetwork::new(actor_config, device)?;
        let critic = CriticNetwork::new(critic_config, device)?;

        // Targets start as exact copies
        let actor_target = actor.model().valid();
        let critic_target = critic.model().valid();

        log::info!(
            "DDPG agent: state {} -> action {}, buffer {}, batch {}, gamma {}, tau {}",
            actor.config().state_size,
            action_size,
            config.buffer_size,
            config.batch_size,
            config.gamma,
            config.tau
        );

        Ok(Self {
            memory: ReplayBuffer::new(config.buffer_size, config.batch_size),
            noise: OUNoise::new(action_size, config.noise.clone()),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            actor,
            actor_target,
            critic,
            critic_target,
            last_state: None,
            learn_steps: 0,
            device: device.clone(),
        })
    }

    /// Build the agent a [`TrainingConfig`] describes.
    pub fn from_training_config(config: &TrainingConfig, device: &B::Device) -> Result<Self> {
        Self::new(
            config.agent.clone(),
            config.actor_config(),
            config.critic_config(),
            device,
        )
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &DDPGConfig {
        &self.config
    }

    pub fn actor(&self) -> &ActorNetwork<B> {
        &self.actor
    }

    pub fn critic(&self) -> &CriticNetwork<B> {
        &self.critic
    }

    pub fn actor_target(&self) -> &Actor<B::InnerBackend> {
        &self.actor_target
    }

    pub fn critic_target(&self) -> &Critic<B::InnerBackend> {
        &self.critic_target
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn learn_steps(&self) -> usize {
        self.learn_steps
    }

    pub fn state_size(&self) -> usize {
        self.actor.config().state_size
    }

    pub fn action_size(&self) -> usize {
        self.actor.config().action_size
    }

    /// Replace online and target weights, e.g. with a loaded checkpoint.
    pub fn load_models(&mut self, actor: Actor<B>, critic: Critic<B>) {
        self.actor_target = actor.valid();
        self.critic_target = critic.valid();
        self.actor.set_model(actor);
        self.critic.set_model(critic);
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    /// Start a new episode from `state`.
    pub fn reset_episode(&mut self, state: &[f32]) {
        self.noise.reset();
        self.last_state = Some(state.to_vec());
    }

    /// Policy action for `state`, plus scaled OU noise when `explore` is set.
    /// Always within the actor's action range.
    pub fn act(&mut self, state: &[f32], explore: bool) -> Result<Vec<f32>> {
        self.check_len("state", state, self.state_size())?;
        let mut action = self.actor.predict(state)?;

        if explore {
            let scale = self.config.noise_scale;
            let noise = self.noise.sample(&mut self.rng);
            for (a, n) in action.iter_mut().zip(noise.iter()) {
                *a += scale * n;
            }
        }

        let low = self.actor.config().action_low;
        let high = self.actor.config().action_high;
        for a in action.iter_mut() {
            *a = a.clamp(low, high);
        }
        Ok(action)
    }

    /// Record a transition from the last state and learn when enough
    /// experience has been collected.
    pub fn step(
        &mut self,
        action: &[f32],
        reward: f32,
        next_state: &[f32],
        done: bool,
    ) -> Result<Option<LearnStats>> {
        self.check_len("action", action, self.action_size())?;
        self.check_len("next_state", next_state, self.state_size())?;
        let state = self.last_state.take().ok_or(DdpgError::EpisodeNotStarted)?;

        self.memory.add(Experience::new(
            state,
            action.to_vec(),
            reward,
            next_state.to_vec(),
            done,
        ));
        self.last_state = Some(next_state.to_vec());

        if !self.memory.is_ready() {
            return Ok(None);
        }
        match self.memory.sample(&mut self.rng) {
            Some(experiences) => self.learn(&experiences).map(Some),
            None => Ok(None),
        }
    }

    /// One update of critic, actor and both targets from a batch.
    pub fn learn(&mut self, experiences: &[Experience]) -> Result<LearnStats> {
        let batch = ExperienceBatch::from_experiences(experiences);
        if batch.is_empty() {
            return Err(DdpgError::Config("cannot learn from an empty batch".to_string()));
        }

        let q_targets = self.td_targets(&batch)?;
        let mean_q_target = q_targets.iter().sum::<f32>() / q_targets.len() as f32;

        let critic_loss = self
            .critic
            .train_on_batch(&batch.states, &batch.actions, &q_targets)?;

        let action_gradients = self
            .critic
            .get_action_gradients(&batch.states, &batch.actions)?;
        let actor_loss = self.actor.train(&batch.states, &action_gradients)?;

        self.update_targets();
        self.learn_steps += 1;

        log::trace!(
            "learn step {}: critic {:.4}, actor {:.4}, mean target {:.3}",
            self.learn_steps,
            critic_loss,
            actor_loss,
            mean_q_target
        );

        Ok(LearnStats {
            critic_loss,
            actor_loss,
            mean_q_target,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// `r + γ · Q_target(s', μ_target(s')) · (1 − done)`
    fn td_targets(&self, batch: &ExperienceBatch) -> Result<Vec<f32>> {
        let next_states = to_batch_tensor::<B::InnerBackend>(
            "next_states",
            &batch.next_states,
            self.state_size(),
            &self.device,
        )?;
        let rewards = Tensor::<B::InnerBackend, 1>::from_floats(batch.rewards.as_slice(), &self.device);
        let dones = Tensor::<B::InnerBackend, 1>::from_floats(batch.dones.as_slice(), &self.device);

        let next_actions = self
            .actor_target
            .forward(next_states.clone(), LearningPhase::Inference);
        let next_q: Tensor<B::InnerBackend, 1> = self
            .critic_target
            .forward(next_states, next_actions, LearningPhase::Inference)
            .flatten(0, 1);

        let not_done = dones.mul_scalar(-1.0).add_scalar(1.0);
        let targets = rewards + next_q.mul(not_done).mul_scalar(self.config.gamma);
        tensor_to_vec(targets)
    }

    fn update_targets(&mut self) {
        let tau = self.config.tau;
        self.actor_target = soft_update::<B::InnerBackend, _>(
            &self.actor.model().valid(),
            self.actor_target.clone(),
            tau,
        );
        self.critic_target = soft_update::<B::InnerBackend, _>(
            &self.critic.model().valid(),
            self.critic_target.clone(),
            tau,
        );
    }

    fn check_len(&self, name: &'static str, values: &[f32], expected: usize) -> Result<()> {
        if values.len() != expected {
            return Err(DdpgError::Dimension {
                name,
                expected,
                actual: values.len(),
            });
        }
        Ok(())
    }
}
