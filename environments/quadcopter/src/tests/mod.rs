//! Behavioral tests for the quadcopter simulator.
//!
//! ## Organization
//!
//! - `physics_tests`: Force, torque and integration correctness
//! - `sim_tests`: Simulator lifecycle, bounds and done semantics
