//! Rigid-body quadcopter simulator.
//!
//! A single X-configuration airframe driven by four rotor speeds (rev/s),
//! integrated at a fixed timestep with quaternion attitude, first-order
//! motor lag and quadratic drag. The [`Simulator`] trait is the seam a
//! reinforcement-learning task wraps: it exposes the 6-DOF pose, velocities,
//! elapsed time and a sticky done flag.
//!
//! # Example
//!
//! ```
//! use quadcopter_sim::{PhysicsSim, SimConfig, Simulator, HOVER_ROTOR_SPEED};
//!
//! let mut sim = PhysicsSim::new(SimConfig::default()).unwrap();
//! let done = sim.next_timestep(&[HOVER_ROTOR_SPEED; 4]).unwrap();
//! assert!(!done);
//! assert!((sim.pose()[2] - 10.0).abs() < 0.01);
//! ```

// Core modules
pub mod config;
pub mod constants;
pub mod error;
pub mod state;

// Physics simulation
pub mod physics;

pub mod sim;

#[cfg(test)]
pub mod tests;

pub use config::SimConfig;
pub use constants::{
    G, GRAVITY_FORCE, HOVER_ROTOR_SPEED, IXX, IYY, IZZ, KF, KM, L, M, MAX_ROTOR_SPEED,
    MIN_ROTOR_SPEED, NUM_ROTORS,
};
pub use error::SimError;
pub use physics::motor::MotorDynamicsConfig;
pub use sim::{PhysicsSim, Simulator};
pub use state::RigidBodyState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
