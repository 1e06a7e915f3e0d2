//! # quad_ddpg: Deep Deterministic Policy Gradient for quadcopter control
//!
//! An actor-critic agent that learns rotor speeds for a simulated
//! quadcopter, built on burn.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           DDPGAgent                              │
//! │                                                                  │
//! │  ┌────────────┐   soft update   ┌────────────────┐               │
//! │  │ Actor      │ ──────────────► │ Actor target   │               │
//! │  │ s → a      │                 │ (inner backend)│               │
//! │  └─────▲──────┘                 └───────┬────────┘               │
//! │        │ dQ/da                          │ a'                     │
//! │  ┌─────┴──────┐   soft update   ┌───────▼────────┐               │
//! │  │ Critic     │ ──────────────► │ Critic target  │ → TD targets  │
//! │  │ (s, a) → Q │                 │ (inner backend)│               │
//! │  └─────▲──────┘                 └────────────────┘               │
//! │        │ batches                                                 │
//! │  ┌─────┴──────┐      ┌──────────┐                                │
//! │  │ReplayBuffer│      │ OUNoise  │ → exploration                  │
//! │  └────────────┘      └──────────┘                                │
//! └───────────────────────────────▲──────────────────────────────────┘
//!                                 │ (s, a, r, s', done)
//!                      ┌──────────┴──────────┐
//!                      │ Task<PhysicsSim>    │
//!                      │ action repeat,      │
//!                      │ stacked poses,      │
//!                      │ reward              │
//!                      └─────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use quad_ddpg::{train, ConsoleLogger, DDPGAgent, Task, TrainingConfig};
//!
//! type B = Autodiff<NdArray<f32>>;
//!
//! let config = TrainingConfig::load("train.toml")?;
//! let device = Default::default();
//! let mut task = Task::from_config(config.task.clone())?;
//! let mut agent = DDPGAgent::<B>::from_training_config(&config, &device)?;
//! let mut logger = ConsoleLogger::new(10);
//! let summary = train(&mut agent, &mut task, &config.runner, &mut logger, None)?;
//! ```

pub mod agent;
pub mod checkpoint;
pub mod core;
pub mod error;
pub mod metrics;
pub mod networks;
pub mod runner;
pub mod task;

#[cfg(test)]
mod tests;

pub use agent::{DDPGAgent, DDPGConfig, LearnStats, TrainingConfig};
pub use checkpoint::{CheckpointError, CheckpointInfo, Checkpointer, CheckpointerConfig};
pub use core::{soft_update, Experience, ExperienceBatch, OUNoise, OUNoiseConfig, ReplayBuffer};
pub use error::{DdpgError, Result, TaskError};
pub use metrics::{CSVLogger, ConsoleLogger, EpisodeSnapshot, MetricsLogger, MultiLogger};
pub use networks::{
    Actor, ActorConfig, ActorNetwork, Critic, CriticConfig, CriticNetwork, LearningPhase,
    NetworkConfig,
};
pub use runner::{evaluate, train, EpisodeReport, RunnerConfig, TrainingSummary};
pub use task::{RewardConfig, Task, TaskConfig, TaskStep, POSE_SIZE};
