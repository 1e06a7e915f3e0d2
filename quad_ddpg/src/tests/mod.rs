//! End-to-end tests for the agent and the episode loop.
//!
//! ## Organization
//!
//! - `agent_tests`: Acting, transition bookkeeping and learning steps
//! - `training_tests`: Training runs, early stopping, evaluation and checkpoints

pub mod training_tests;

use burn::backend::{Autodiff, NdArray};
use quadcopter_sim::SimConfig;

use crate::agent::{DDPGConfig, TrainingConfig};
use crate::networks::NetworkConfig;
use crate::runner::RunnerConfig;
use crate::task::TaskConfig;

pub type TestBackend = Autodiff<NdArray<f32>>;

/// Small networks and a short episode (about six agent steps).
pub fn small_config() -> TrainingConfig {
    let network = NetworkConfig::default().with_hidden_size(16);
    TrainingConfig::default()
        .with_task(TaskConfig::default().with_sim(SimConfig::new().with_runtime(0.3)))
        .with_agent(
            DDPGConfig::default()
                .with_buffer_size(64)
                .with_batch_size(4)
                .with_noise_scale(50.0),
        )
        .with_actor(network.clone())
        .with_critic(network)
        .with_runner(RunnerConfig::default().with_num_episodes(3).with_score_window(2))
}
