//! Core rigid body dynamics for the quadcopter.
//!
//! Implements the physics equations for an X-configuration airframe:
//! - Thrust and torque computation from rotor speeds
//! - Rigid body dynamics with quaternion rotation
//! - Quadratic aerodynamic drag
//! - Semi-implicit Euler integration for state update

use crate::constants::*;
use crate::physics::quaternion::*;
use crate::state::RigidBodyState;

/// Compute thrust force from 4 rotor speeds.
/// F_i = KF * n_i^2
#[inline(always)]
pub fn compute_thrusts(speeds: [f32; 4]) -> [f32; 4] {
    [
        KF * speeds[0] * speeds[0],
        KF * speeds[1] * speeds[1],
        KF * speeds[2] * speeds[2],
        KF * speeds[3] * speeds[3],
    ]
}

/// Compute total thrust magnitude (sum of all motor thrusts).
#[inline(always)]
pub fn compute_total_thrust(thrusts: [f32; 4]) -> f32 {
    thrusts[0] + thrusts[1] + thrusts[2] + thrusts[3]
}

/// Compute body-frame torques from motor thrusts and reaction torques.
///
/// Motor positions relative to CoM:
/// - Motor 0 (FR): (+L/√2, -L/√2, 0) CCW
/// - Motor 1 (RR): (-L/√2, -L/√2, 0) CW
/// - Motor 2 (RL): (-L/√2, +L/√2, 0) CCW
/// - Motor 3 (FL): (+L/√2, +L/√2, 0) CW
#[inline(always)]
pub fn compute_thrust_torques(thrusts: [f32; 4], speeds: [f32; 4]) -> [f32; 3] {
    // Left motors up → positive roll
    let tau_x = L_SQRT2 * (thrusts[2] + thrusts[3] - thrusts[0] - thrusts[1]);

    // Rear motors up → positive pitch
    let tau_y = L_SQRT2 * (thrusts[1] + thrusts[2] - thrusts[0] - thrusts[3]);

    let tau_z = KM
        * (MOTOR_DIRS[0] * speeds[0] * speeds[0]
            + MOTOR_DIRS[1] * speeds[1] * speeds[1]
            + MOTOR_DIRS[2] * speeds[2] * speeds[2]
            + MOTOR_DIRS[3] * speeds[3] * speeds[3]);

    [tau_x, tau_y, tau_z]
}

/// Compute gyroscopic precession torque from spinning propellers.
///
/// τ_gyro = J_prop * ω_prop_net * [ω_y, -ω_x, 0]
///
/// The net propeller angular velocity accounts for CW/CCW directions:
/// ω_prop_net = Σ(dir_i * n_i) * 2π
#[inline(always)]
pub fn compute_gyroscopic_torque(speeds: [f32; 4], omega: [f32; 3]) -> [f32; 3] {
    let omega_prop_net = (MOTOR_DIRS[0] * speeds[0]
        + MOTOR_DIRS[1] * speeds[1]
        + MOTOR_DIRS[2] * speeds[2]
        + MOTOR_DIRS[3] * speeds[3])
        * PROP_VEL_COEFF;

    let h_prop = PROP_INERTIA * omega_prop_net;

    [h_prop * omega[1], -h_prop * omega[0], 0.0]
}

/// Compute total body-frame torques including gyroscopic precession.
#[inline(always)]
pub fn compute_torques(thrusts: [f32; 4], speeds: [f32; 4], omega: [f32; 3]) -> [f32; 3] {
    let thrust_torques = compute_thrust_torques(thrusts, speeds);
    let gyro_torques = compute_gyroscopic_torque(speeds, omega);

    [
        thrust_torques[0] + gyro_torques[0],
        thrust_torques[1] + gyro_torques[1],
        thrust_torques[2] + gyro_torques[2],
    ]
}

/// Quadratic drag force in world frame: F = -c * v * |v|.
#[inline(always)]
pub fn compute_drag_force(velocity: [f32; 3]) -> [f32; 3] {
    [
        -DRAG_COEFF_XY * velocity[0] * velocity[0].abs(),
        -DRAG_COEFF_XY * velocity[1] * velocity[1].abs(),
        -DRAG_COEFF_Z * velocity[2] * velocity[2].abs(),
    ]
}

/// Compute linear acceleration in world frame.
///
/// a = (R * [0, 0, F_total] + F_ext) / m - [0, 0, g]
#[inline(always)]
pub fn compute_linear_acceleration(
    quat: [f32; 4],
    total_thrust: f32,
    external_force: [f32; 3],
) -> [f32; 3] {
    let thrust_dir = quat_to_thrust_dir(quat);

    [
        (thrust_dir[0] * total_thrust + external_force[0]) * M_INV,
        (thrust_dir[1] * total_thrust + external_force[1]) * M_INV,
        (thrust_dir[2] * total_thrust + external_force[2]) * M_INV - G,
    ]
}

/// Compute angular acceleration in body frame.
///
/// α = J⁻¹ * (τ - ω × Jω)
#[inline(always)]
pub fn compute_angular_acceleration(torques: [f32; 3], omega: [f32; 3]) -> [f32; 3] {
    let (tau_x, tau_y, tau_z) = (torques[0], torques[1], torques[2]);
    let (wx, wy, wz) = (omega[0], omega[1], omega[2]);

    let gyro_x = wy * wz * (IZZ - IYY);
    let gyro_y = wx * wz * (IXX - IZZ);
    let gyro_z = wx * wy * (IYY - IXX);

    [
        (tau_x - gyro_x) * IXX_INV,
        (tau_y - gyro_y) * IYY_INV,
        (tau_z - gyro_z) * IZZ_INV,
    ]
}

/// Perform one physics step using semi-implicit Euler integration.
///
/// # Arguments
/// * `state` - Rigid body state, updated in place
/// * `speeds` - Effective rotor speeds (rev/s)
/// * `dt` - Time step in seconds
/// * `drag` - Whether to apply aerodynamic drag
#[inline]
pub fn physics_step(state: &mut RigidBodyState, speeds: [f32; 4], dt: f32, drag: bool) {
    let thrusts = compute_thrusts(speeds);
    let total_thrust = compute_total_thrust(thrusts);
    let torques = compute_torques(thrusts, speeds, state.angular_velocity);

    let external = if drag {
        compute_drag_force(state.velocity)
    } else {
        [0.0; 3]
    };

    let lin_accel = compute_linear_acceleration(state.quaternion, total_thrust, external);
    let ang_accel = compute_angular_acceleration(torques, state.angular_velocity);

    for i in 0..3 {
        state.velocity[i] += lin_accel[i] * dt;
        state.position[i] += state.velocity[i] * dt;
        state.angular_velocity[i] += ang_accel[i] * dt;
    }

    state.quaternion = quat_integrate(state.quaternion, state.angular_velocity, dt);
}
