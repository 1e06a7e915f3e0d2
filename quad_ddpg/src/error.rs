//! Error types for the agent, task and training loop.

use std::io;

use quadcopter_sim::SimError;
use thiserror::Error;

/// Errors raised by [`crate::task::Task`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    /// Wrong number of action components.
    #[error("expected {expected} action components, got {actual}")]
    ActionSize { expected: usize, actual: usize },

    /// An action component is NaN or infinite.
    #[error("action component {index} is not finite")]
    NonFiniteAction { index: usize },

    /// Task configuration is inconsistent.
    #[error("invalid task config: {0}")]
    InvalidConfig(String),

    /// The wrapped simulator failed.
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Top-level error type for the agent and training loop.
#[derive(Debug, Error)]
pub enum DdpgError {
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Flat input does not describe a whole batch.
    #[error("`{name}` has {len} values, which is not a multiple of row width {width}")]
    BatchShape {
        name: &'static str,
        len: usize,
        width: usize,
    },

    /// Two inputs of the same batch disagree on the batch size.
    #[error("batch size mismatch: `{name}` has {actual} rows, expected {expected}")]
    BatchMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A single state or action vector has the wrong length.
    #[error("`{name}` has {actual} values, expected {expected}")]
    Dimension {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// `step` was called before `reset_episode`.
    #[error("no episode in progress: call reset_episode first")]
    EpisodeNotStarted,

    /// Tensor data could not be read back.
    #[error("tensor data error: {0}")]
    Tensor(String),

    /// Gradient with respect to the action input was not tracked.
    #[error("action gradients were not tracked by the autodiff graph")]
    MissingGradient,

    /// Configuration value out of range.
    #[error("invalid config: {0}")]
    Config(String),

    /// TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// TOML could not be produced.
    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Checkpoint(#[from] crate::checkpoint::CheckpointError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DdpgError>;
