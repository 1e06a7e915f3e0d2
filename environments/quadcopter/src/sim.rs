//! Single-airframe physics simulator.
//!
//! [`PhysicsSim`] advances one quadcopter by a fixed timestep per call to
//! [`Simulator::next_timestep`]. The episode ends (and stays ended until
//! [`Simulator::reset`]) when the elapsed time exceeds the configured runtime
//! or the airframe touches a position bound. Positions are clamped to the
//! bounds and the outward velocity component is removed on contact.

use crate::config::SimConfig;
use crate::constants::{clamp_rotor_speed, NUM_ROTORS};
use crate::error::SimError;
use crate::physics::dynamics::physics_step;
use crate::physics::motor::effective_rotor_speeds;
use crate::state::RigidBodyState;

/// Interface a task needs from a physics backend.
pub trait Simulator {
    /// Current pose [x, y, z, roll, pitch, yaw].
    fn pose(&self) -> [f32; 6];

    /// Current world-frame velocity [vx, vy, vz].
    fn velocity(&self) -> [f32; 3];

    /// Current body rates [p, q, r].
    fn angular_velocity(&self) -> [f32; 3];

    /// Elapsed simulated time (s).
    fn time(&self) -> f32;

    /// Episode runtime (s).
    fn runtime(&self) -> f32;

    /// Whether the episode has ended.
    fn is_done(&self) -> bool;

    /// Advance one timestep with the given rotor speeds (rev/s).
    ///
    /// Returns the done flag after the step.
    fn next_timestep(&mut self, rotor_speeds: &[f32]) -> Result<bool, SimError>;

    /// Restore the initial conditions.
    fn reset(&mut self);
}

/// Rigid-body quadcopter simulator.
#[derive(Clone, Debug)]
pub struct PhysicsSim {
    config: SimConfig,
    state: RigidBodyState,
    rotor_speeds: [f32; NUM_ROTORS],
    steps: usize,
    done: bool,
}

impl PhysicsSim {
    /// Create a simulator from a validated config.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let state = Self::initial_state(&config);
        Ok(Self {
            config,
            state,
            rotor_speeds: [0.0; NUM_ROTORS],
            steps: 0,
            done: false,
        })
    }

    fn initial_state(config: &SimConfig) -> RigidBodyState {
        RigidBodyState::from_pose(
            config.init_pose,
            config.init_velocities,
            config.init_angle_velocities,
        )
    }

    /// Get the configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Get read access to the rigid body state.
    pub fn state(&self) -> &RigidBodyState {
        &self.state
    }

    /// Rotor speeds applied during the last step (after motor lag).
    pub fn rotor_speeds(&self) -> [f32; NUM_ROTORS] {
        self.rotor_speeds
    }

    /// Number of integration steps since the last reset.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn parse_command(rotor_speeds: &[f32]) -> Result<[f32; NUM_ROTORS], SimError> {
        if rotor_speeds.len() != NUM_ROTORS {
            return Err(SimError::RotorCount {
                expected: NUM_ROTORS,
                actual: rotor_speeds.len(),
            });
        }
        let mut cmd = [0.0; NUM_ROTORS];
        for (i, (c, &s)) in cmd.iter_mut().zip(rotor_speeds).enumerate() {
            if !s.is_finite() {
                return Err(SimError::NonFiniteRotorSpeed { index: i });
            }
            *c = clamp_rotor_speed(s);
        }
        Ok(cmd)
    }

    /// Clamp position into bounds. Returns true if any bound was touched.
    fn enforce_bounds(&mut self) -> bool {
        let mut hit = false;
        for i in 0..3 {
            let lower = self.config.lower_bounds[i];
            let upper = self.config.upper_bounds[i];
            let p = self.state.position[i];
            if p <= lower {
                self.state.position[i] = lower;
                self.state.velocity[i] = self.state.velocity[i].max(0.0);
                hit = true;
            } else if p >= upper {
                self.state.position[i] = upper;
                self.state.velocity[i] = self.state.velocity[i].min(0.0);
                hit = true;
            }
        }
        hit
    }
}

impl Simulator for PhysicsSim {
    fn pose(&self) -> [f32; 6] {
        self.state.pose()
    }

    fn velocity(&self) -> [f32; 3] {
        self.state.velocity
    }

    fn angular_velocity(&self) -> [f32; 3] {
        self.state.angular_velocity
    }

    fn time(&self) -> f32 {
        self.steps as f32 * self.config.dt
    }

    fn runtime(&self) -> f32 {
        self.config.runtime
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn next_timestep(&mut self, rotor_speeds: &[f32]) -> Result<bool, SimError> {
        let cmd = Self::parse_command(rotor_speeds)?;
        let dt = self.config.dt;

        let speeds = effective_rotor_speeds(cmd, &mut self.rotor_speeds, &self.config.motor, dt);
        physics_step(&mut self.state, speeds, dt, self.config.drag);
        self.steps += 1;

        let out_of_bounds = self.enforce_bounds();
        let timed_out = self.time() > self.config.runtime;

        if !self.done && (out_of_bounds || timed_out) {
            log::debug!(
                "episode ended at t={:.2}s (out_of_bounds={}, timed_out={}) pose={:?}",
                self.time(),
                out_of_bounds,
                timed_out,
                self.state.pose()
            );
        }
        self.done |= out_of_bounds || timed_out;

        Ok(self.done)
    }

    fn reset(&mut self) {
        self.state = Self::initial_state(&self.config);
        self.rotor_speeds = [0.0; NUM_ROTORS];
        self.steps = 0;
        self.done = false;
    }
}
