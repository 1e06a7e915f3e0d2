//! Configuration for the physics simulator.
//!
//! # Example
//! ```
//! use quadcopter_sim::SimConfig;
//!
//! let config = SimConfig::new()
//!     .with_init_pose([0.0, 0.0, 5.0, 0.0, 0.0, 0.0])
//!     .with_runtime(3.0)
//!     .with_drag(false);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::SimError;
use crate::physics::motor::MotorDynamicsConfig;

/// Simulator configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Initial pose [x, y, z, roll, pitch, yaw]
    pub init_pose: [f32; 6],
    /// Initial linear velocity [vx, vy, vz] (m/s)
    pub init_velocities: [f32; 3],
    /// Initial body rates [p, q, r] (rad/s)
    pub init_angle_velocities: [f32; 3],
    /// Episode duration (s); the simulator reports done once time exceeds it
    pub runtime: f32,
    /// Integration timestep (s)
    pub dt: f32,
    /// Lower position bounds [x, y, z] (m)
    pub lower_bounds: [f32; 3],
    /// Upper position bounds [x, y, z] (m)
    pub upper_bounds: [f32; 3],
    /// Motor response model
    pub motor: MotorDynamicsConfig,
    /// Apply quadratic aerodynamic drag
    pub drag: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            init_pose: DEFAULT_INIT_POSE,
            init_velocities: [0.0; 3],
            init_angle_velocities: [0.0; 3],
            runtime: DEFAULT_RUNTIME,
            dt: DEFAULT_DT,
            lower_bounds: DEFAULT_LOWER_BOUNDS,
            upper_bounds: DEFAULT_UPPER_BOUNDS,
            motor: MotorDynamicsConfig::default(),
            drag: true,
        }
    }
}

impl SimConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial pose.
    pub fn with_init_pose(mut self, pose: [f32; 6]) -> Self {
        self.init_pose = pose;
        self
    }

    /// Set the initial linear velocity.
    pub fn with_init_velocities(mut self, v: [f32; 3]) -> Self {
        self.init_velocities = v;
        self
    }

    /// Set the initial body rates.
    pub fn with_init_angle_velocities(mut self, w: [f32; 3]) -> Self {
        self.init_angle_velocities = w;
        self
    }

    /// Set the episode runtime.
    pub fn with_runtime(mut self, runtime: f32) -> Self {
        self.runtime = runtime;
        self
    }

    /// Set the integration timestep.
    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    /// Set the position bounds.
    pub fn with_bounds(mut self, lower: [f32; 3], upper: [f32; 3]) -> Self {
        self.lower_bounds = lower;
        self.upper_bounds = upper;
        self
    }

    /// Set the motor response model.
    pub fn with_motor_dynamics(mut self, motor: MotorDynamicsConfig) -> Self {
        self.motor = motor;
        self
    }

    /// Enable or disable drag.
    pub fn with_drag(mut self, enabled: bool) -> Self {
        self.drag = enabled;
        self
    }

    /// Number of integration steps in one episode.
    pub fn steps_per_episode(&self) -> usize {
        (self.runtime / self.dt).ceil() as usize
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(SimError::invalid("dt", format!("must be positive, got {}", self.dt)));
        }

        if !(self.runtime > 0.0 && self.runtime.is_finite()) {
            return Err(SimError::invalid(
                "runtime",
                format!("must be positive, got {}", self.runtime),
            ));
        }

        if self.motor.time_constant < 0.0 {
            return Err(SimError::invalid("motor.time_constant", "must be non-negative"));
        }

        for i in 0..3 {
            if self.lower_bounds[i] >= self.upper_bounds[i] {
                return Err(SimError::invalid(
                    "bounds",
                    format!(
                        "lower bound {} must be below upper bound {} on axis {}",
                        self.lower_bounds[i], self.upper_bounds[i], i
                    ),
                ));
            }
            let p = self.init_pose[i];
            if p < self.lower_bounds[i] || p > self.upper_bounds[i] {
                return Err(SimError::invalid(
                    "init_pose",
                    format!("position {} on axis {} lies outside the bounds", p, i),
                ));
            }
        }

        let all_finite = self
            .init_pose
            .iter()
            .chain(self.init_velocities.iter())
            .chain(self.init_angle_velocities.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(SimError::invalid("initial state", "must be finite"));
        }

        Ok(())
    }
}
