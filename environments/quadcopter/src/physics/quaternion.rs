//! Quaternion operations for rigid body rotation.
//!
//! Quaternions are stored as `[w, x, y, z]`. Euler angles follow the ZYX
//! (yaw-pitch-roll) convention and are reported as `[roll, pitch, yaw]`.

use std::f32::consts::PI;

/// Identity rotation.
pub const QUAT_IDENTITY: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

/// Normalize a quaternion to unit length.
#[inline(always)]
pub fn quat_normalize(q: [f32; 4]) -> [f32; 4] {
    let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if norm < 1e-10 {
        return QUAT_IDENTITY;
    }
    let inv_norm = 1.0 / norm;
    [
        q[0] * inv_norm,
        q[1] * inv_norm,
        q[2] * inv_norm,
        q[3] * inv_norm,
    ]
}

/// Multiply two quaternions: q_result = q1 * q2.
#[inline(always)]
pub fn quat_mul(q1: [f32; 4], q2: [f32; 4]) -> [f32; 4] {
    let (w1, x1, y1, z1) = (q1[0], q1[1], q1[2], q1[3]);
    let (w2, x2, y2, z2) = (q2[0], q2[1], q2[2], q2[3]);

    [
        w1 * w2 - x1 * x2 - y1 * y2 - z1 * z2,
        w1 * x2 + x1 * w2 + y1 * z2 - z1 * y2,
        w1 * y2 - x1 * z2 + y1 * w2 + z1 * x2,
        w1 * z2 + x1 * y2 - y1 * x2 + z1 * w2,
    ]
}

/// Integrate an orientation with a body-frame angular velocity.
///
/// q_new = q * exp(dt/2 * omega)
///
/// # Arguments
/// * `q` - Current quaternion [w, x, y, z]
/// * `omega` - Angular velocity [wx, wy, wz] in body frame
/// * `dt` - Time step
#[inline(always)]
pub fn quat_integrate(q: [f32; 4], omega: [f32; 3], dt: f32) -> [f32; 4] {
    let (wx, wy, wz) = (omega[0], omega[1], omega[2]);
    let omega_norm = (wx * wx + wy * wy + wz * wz).sqrt();

    if omega_norm < 1e-10 {
        return q;
    }

    let half_theta = omega_norm * dt * 0.5;
    let s = half_theta.sin() / omega_norm;
    let c = half_theta.cos();

    let dq = [c, s * wx, s * wy, s * wz];

    // Body-frame increment is applied on the right
    quat_normalize(quat_mul(q, dq))
}

/// Get the Z column of the rotation matrix (thrust direction in world frame).
#[inline(always)]
pub fn quat_to_thrust_dir(q: [f32; 4]) -> [f32; 3] {
    let (w, x, y, z) = (q[0], q[1], q[2], q[3]);
    [
        2.0 * (x * z + w * y),
        2.0 * (y * z - w * x),
        1.0 - 2.0 * (x * x + y * y),
    ]
}

/// Convert quaternion to Euler angles (roll, pitch, yaw).
#[inline(always)]
pub fn quat_to_euler(q: [f32; 4]) -> [f32; 3] {
    let (w, x, y, z) = (q[0], q[1], q[2], q[3]);

    let sinr_cosp = 2.0 * (w * x + y * z);
    let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
    let roll = sinr_cosp.atan2(cosr_cosp);

    let sinp = 2.0 * (w * y - z * x);
    let pitch = if sinp.abs() >= 1.0 {
        (PI / 2.0).copysign(sinp) // Gimbal lock
    } else {
        sinp.asin()
    };

    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    [wrap_angle(roll), wrap_angle(pitch), wrap_angle(yaw)]
}

/// Convert Euler angles (roll, pitch, yaw) to quaternion.
#[inline(always)]
pub fn euler_to_quat(rpy: [f32; 3]) -> [f32; 4] {
    let (roll, pitch, yaw) = (rpy[0], rpy[1], rpy[2]);

    let cr = (roll * 0.5).cos();
    let sr = (roll * 0.5).sin();
    let cp = (pitch * 0.5).cos();
    let sp = (pitch * 0.5).sin();
    let cy = (yaw * 0.5).cos();
    let sy = (yaw * 0.5).sin();

    [
        cr * cp * cy + sr * sp * sy,
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
    ]
}

/// Wrap an angle into `(-PI, PI]`.
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let mut a = angle % two_pi;
    if a <= -PI {
        a += two_pi;
    } else if a > PI {
        a -= two_pi;
    }
    a
}
