//! DDPG agent and its configuration.

pub mod config;
pub mod ddpg;

pub use config::{DDPGConfig, TrainingConfig};
pub use ddpg::{DDPGAgent, LearnStats};
