//! Building blocks shared by the agent: replay memory, exploration noise and
//! target network tracking.

pub mod noise;
pub mod replay_buffer;
pub mod target_network;

pub use noise::{OUNoise, OUNoiseConfig};
pub use replay_buffer::{Experience, ExperienceBatch, ReplayBuffer};
pub use target_network::soft_update;
