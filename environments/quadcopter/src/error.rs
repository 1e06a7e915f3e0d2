//! Error types for the simulator.

use thiserror::Error;

/// Errors raised while configuring or stepping the simulator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A configuration value is out of range.
    #[error("invalid config for `{param}`: {message}")]
    InvalidConfig {
        param: &'static str,
        message: String,
    },

    /// Wrong number of rotor speeds.
    #[error("expected {expected} rotor speeds, got {actual}")]
    RotorCount { expected: usize, actual: usize },

    /// A rotor speed command is NaN or infinite.
    #[error("rotor speed {index} is not finite")]
    NonFiniteRotorSpeed { index: usize },
}

impl SimError {
    pub(crate) fn invalid(param: &'static str, message: impl Into<String>) -> Self {
        SimError::InvalidConfig {
            param,
            message: message.into(),
        }
    }
}
