//! Physics simulation modules for the quadcopter.
//!
//! Contains:
//! - Quaternion operations
//! - Core rigid body dynamics
//! - Motor dynamics (first-order response)

pub mod dynamics;
pub mod motor;
pub mod quaternion;

pub use dynamics::*;
pub use motor::*;
pub use quaternion::*;
