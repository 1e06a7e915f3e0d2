//! Agent hyperparameters and the top-level training configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointerConfig;
use crate::core::OUNoiseConfig;
use crate::error::{DdpgError, Result};
use crate::networks::{ActorConfig, CriticConfig, NetworkConfig};
use crate::runner::RunnerConfig;
use crate::task::{TaskConfig, POSE_SIZE};
use quadcopter_sim::NUM_ROTORS;

// ============================================================================
// DDPG Configuration
// ============================================================================

/// Hyperparameters of the DDPG update rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DDPGConfig {
    // ========================================================================
    // Learning
    // ========================================================================
    /// Discount factor.
    pub gamma: f32,

    /// Soft update coefficient for both target networks.
    pub tau: f32,

    // ========================================================================
    // Replay Memory
    // ========================================================================
    /// Maximum transitions kept.
    pub buffer_size: usize,

    /// Transitions per learning step. Learning starts once the buffer holds
    /// more than this many.
    pub batch_size: usize,

    // ========================================================================
    // Exploration
    // ========================================================================
    pub noise: OUNoiseConfig,

    /// Multiplier applied to the noise sample before it is added to an action.
    /// Rotor speeds span hundreds of rev/s, so values well above 1 are useful.
    pub noise_scale: f32,

    /// Seed for replay sampling and exploration noise.
    pub seed: u64,
}

impl Default for DDPGConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            tau: 0.01,
            buffer_size: 100_000,
            batch_size: 64,
            noise: OUNoiseConfig::default(),
            noise_scale: 1.0,
            seed: 42,
        }
    }
}

impl DDPGConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_tau(mut self, tau: f32) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_noise(mut self, noise: OUNoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_noise_scale(mut self, scale: f32) -> Self {
        self.noise_scale = scale;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(DdpgError::Config(format!("gamma {} not in [0, 1]", self.gamma)));
        }
        if !(0.0..=1.0).contains(&self.tau) {
            return Err(DdpgError::Config(format!("tau {} not in [0, 1]", self.tau)));
        }
        if self.batch_size == 0 {
            return Err(DdpgError::Config("batch_size must be positive".to_string()));
        }
        if self.buffer_size <= self.batch_size {
            return Err(DdpgError::Config(format!(
                "buffer_size ({}) must exceed batch_size ({})",
                self.buffer_size, self.batch_size
            )));
        }
        if self.noise_scale < 0.0 || self.noise.sigma < 0.0 || self.noise.theta < 0.0 {
            return Err(DdpgError::Config(
                "noise_scale, sigma and theta must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Training Configuration
// ============================================================================

/// Everything needed to run a training session, as stored in a TOML file.
///
/// Network input and output sizes are not stored: they follow from the task
/// (`action_repeat` poses in, one speed per rotor out).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub task: TaskConfig,
    pub agent: DDPGConfig,
    pub actor: NetworkConfig,
    pub critic: NetworkConfig,
    pub runner: RunnerConfig,
    pub checkpoint: CheckpointerConfig,
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.task = task;
        self
    }

    pub fn with_agent(mut self, agent: DDPGConfig) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_actor(mut self, actor: NetworkConfig) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_critic(mut self, critic: NetworkConfig) -> Self {
        self.critic = critic;
        self
    }

    pub fn with_runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: CheckpointerConfig) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn state_size(&self) -> usize {
        self.task.action_repeat * POSE_SIZE
    }

    pub fn action_size(&self) -> usize {
        NUM_ROTORS
    }

    pub fn actor_config(&self) -> ActorConfig {
        ActorConfig::new(
            self.state_size(),
            self.action_size(),
            self.task.action_low,
            self.task.action_high,
        )
        .with_network(self.actor.clone())
    }

    pub fn critic_config(&self) -> CriticConfig {
        CriticConfig::new(self.state_size(), self.action_size()).with_network(self.critic.clone())
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.task.validate()?;
        self.agent.validate()?;
        self.actor_config().validate()?;
        self.critic_config().validate()?;
        self.runner.validate()?;
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        log::debug!("loaded config from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.to_toml_string()?)?;
        Ok(())
    }
}
