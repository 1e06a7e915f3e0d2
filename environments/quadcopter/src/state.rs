//! Rigid body state of a single quadcopter.

use crate::physics::quaternion::{euler_to_quat, quat_to_euler, QUAT_IDENTITY};

/// Full kinematic state of the airframe.
///
/// Position and velocity live in the world frame (z up); angular velocity
/// is expressed in the body frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBodyState {
    /// Position [x, y, z] (m)
    pub position: [f32; 3],
    /// Orientation quaternion [w, x, y, z]
    pub quaternion: [f32; 4],
    /// Linear velocity [vx, vy, vz] (m/s)
    pub velocity: [f32; 3],
    /// Body rates [p, q, r] (rad/s)
    pub angular_velocity: [f32; 3],
}

impl Default for RigidBodyState {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            quaternion: QUAT_IDENTITY,
            velocity: [0.0; 3],
            angular_velocity: [0.0; 3],
        }
    }
}

impl RigidBodyState {
    /// Build a state from a 6-DOF pose and initial velocities.
    pub fn from_pose(pose: [f32; 6], velocity: [f32; 3], angular_velocity: [f32; 3]) -> Self {
        Self {
            position: [pose[0], pose[1], pose[2]],
            quaternion: euler_to_quat([pose[3], pose[4], pose[5]]),
            velocity,
            angular_velocity,
        }
    }

    /// Euler angles [roll, pitch, yaw] in `(-PI, PI]`.
    pub fn euler(&self) -> [f32; 3] {
        quat_to_euler(self.quaternion)
    }

    /// Pose [x, y, z, roll, pitch, yaw].
    pub fn pose(&self) -> [f32; 6] {
        let e = self.euler();
        [
            self.position[0],
            self.position[1],
            self.position[2],
            e[0],
            e[1],
            e[2],
        ]
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position
            .iter()
            .chain(self.quaternion.iter())
            .chain(self.velocity.iter())
            .chain(self.angular_velocity.iter())
            .all(|v| v.is_finite())
    }
}
