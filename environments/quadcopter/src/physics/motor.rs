//! Motor dynamics simulation with first-order response.
//!
//! Real motors cannot change speed instantaneously due to rotor inertia.
//! This module implements first-order dynamics:
//!
//! dn/dt = (n_cmd - n_actual) / tau
//!
//! Discretized as:
//! n(t+dt) = alpha * n_cmd + (1-alpha) * n(t)
//! where alpha = dt / (dt + tau)

use serde::{Deserialize, Serialize};

use crate::constants::{clamp_rotor_speed, MOTOR_TIME_CONSTANT, NUM_ROTORS};

/// Motor dynamics configuration.
///
/// `time_constant = 0.0` gives an instantaneous response, which is the default:
/// the commanded rotor speed takes effect on the next integration step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotorDynamicsConfig {
    /// Time constant in seconds. 0.0 disables the lag.
    pub time_constant: f32,
}

impl Default for MotorDynamicsConfig {
    fn default() -> Self {
        Self::instantaneous()
    }
}

impl MotorDynamicsConfig {
    /// Instantaneous motor response.
    #[inline]
    pub const fn instantaneous() -> Self {
        Self { time_constant: 0.0 }
    }

    /// Brushless outrunner response (~20ms time constant).
    #[inline]
    pub const fn realistic() -> Self {
        Self {
            time_constant: MOTOR_TIME_CONSTANT,
        }
    }

    /// Custom time constant.
    #[inline]
    pub const fn with_time_constant(time_constant: f32) -> Self {
        Self { time_constant }
    }

    /// Check if motor dynamics are enabled.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.time_constant > 0.0
    }

    /// Compute alpha coefficient for given timestep.
    /// alpha = dt / (dt + tau)
    #[inline]
    pub fn compute_alpha(&self, dt: f32) -> f32 {
        if self.time_constant <= 0.0 {
            1.0
        } else {
            dt / (dt + self.time_constant)
        }
    }
}

/// Apply first-order motor dynamics to a single motor.
///
/// # Arguments
/// * `cmd_speed` - Commanded rotor speed
/// * `actual_speed` - Current rotor speed
/// * `alpha` - Precomputed coefficient: dt / (dt + tau)
#[inline(always)]
pub fn apply_motor_dynamics(cmd_speed: f32, actual_speed: f32, alpha: f32) -> f32 {
    clamp_rotor_speed(alpha * cmd_speed + (1.0 - alpha) * actual_speed)
}

/// Get effective rotor speeds for physics computation.
///
/// With dynamics enabled `actual` lags toward `cmd`; otherwise `actual`
/// simply tracks the command.
#[inline]
pub fn effective_rotor_speeds(
    cmd: [f32; NUM_ROTORS],
    actual: &mut [f32; NUM_ROTORS],
    config: &MotorDynamicsConfig,
    dt: f32,
) -> [f32; NUM_ROTORS] {
    let alpha = config.compute_alpha(dt);
    for (a, c) in actual.iter_mut().zip(cmd.iter()) {
        *a = apply_motor_dynamics(*c, *a, alpha);
    }
    *actual
}
