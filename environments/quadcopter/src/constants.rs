//! Physical constants for a ~1 kg X-configuration quadcopter.
//!
//! Rotor speeds are expressed in revolutions per second throughout the
//! simulator, matching the action range the task layer exposes.

use std::f32::consts::PI;

// ============================================================================
// Physical Properties
// ============================================================================

/// Mass of the airframe including battery (kg)
pub const M: f32 = 0.958;

/// Arm length - distance from center to motor (m)
pub const L: f32 = 0.17;

/// Gravitational acceleration (m/s^2)
pub const G: f32 = 9.81;

/// Moment of inertia around X axis (kg*m^2)
pub const IXX: f32 = 0.0111;

/// Moment of inertia around Y axis (kg*m^2)
pub const IYY: f32 = 0.0111;

/// Moment of inertia around Z axis (kg*m^2)
pub const IZZ: f32 = 0.0218;

/// Thrust coefficient: F = KF * n^2 (N / (rev/s)^2)
pub const KF: f32 = 1.44e-5;

/// Reaction torque coefficient: tau = KM * n^2 (N*m / (rev/s)^2)
pub const KM: f32 = KF * 0.02;

/// Propeller + rotor moment of inertia about the spin axis (kg*m^2)
pub const PROP_INERTIA: f32 = 2.0e-6;

/// rev/s to rad/s conversion
pub const PROP_VEL_COEFF: f32 = 2.0 * PI;

/// Motor time constant for first-order dynamics (seconds)
pub const MOTOR_TIME_CONSTANT: f32 = 0.02;

/// Lumped quadratic drag coefficient in the XY plane: F = -c * v * |v| (kg/m)
pub const DRAG_COEFF_XY: f32 = 0.08;

/// Lumped quadratic drag coefficient along Z (kg/m)
pub const DRAG_COEFF_Z: f32 = 0.12;

// ============================================================================
// Derived Constants
// ============================================================================

/// Weight force (N) = M * G
pub const GRAVITY_FORCE: f32 = M * G;

/// Hover rotor speed: sqrt(GRAVITY_FORCE / (4 * KF)) ≈ 403.93 rev/s
pub const HOVER_ROTOR_SPEED: f32 = 403.93;

/// Maximum rotor speed (rev/s), thrust-to-weight ratio ≈ 4.96
pub const MAX_ROTOR_SPEED: f32 = 900.0;

/// Minimum rotor speed (motors can't spin backwards)
pub const MIN_ROTOR_SPEED: f32 = 0.0;

/// Arm length divided by sqrt(2) for X-configuration torque computation
pub const L_SQRT2: f32 = 0.120208; // 0.17 / 1.41421

/// Inverse of moment of inertia X
pub const IXX_INV: f32 = 1.0 / IXX;

/// Inverse of moment of inertia Y
pub const IYY_INV: f32 = 1.0 / IYY;

/// Inverse of moment of inertia Z
pub const IZZ_INV: f32 = 1.0 / IZZ;

/// Inverse of mass
pub const M_INV: f32 = 1.0 / M;

// ============================================================================
// Default Simulation Parameters
// ============================================================================

/// Default integration timestep (s), 50 Hz
pub const DEFAULT_DT: f32 = 1.0 / 50.0;

/// Default episode runtime (s)
pub const DEFAULT_RUNTIME: f32 = 5.0;

/// Default initial pose [x, y, z, roll, pitch, yaw]
pub const DEFAULT_INIT_POSE: [f32; 6] = [0.0, 0.0, 10.0, 0.0, 0.0, 0.0];

/// Default lower position bounds [x, y, z] (m)
pub const DEFAULT_LOWER_BOUNDS: [f32; 3] = [-150.0, -150.0, 0.0];

/// Default upper position bounds [x, y, z] (m)
pub const DEFAULT_UPPER_BOUNDS: [f32; 3] = [150.0, 150.0, 300.0];

// ============================================================================
// Motor Configuration (X-configuration)
// ============================================================================
// Motor layout (top view):
//
//      Front
//        ^
//        |
//    3-------0
//     \     /
//      \ X /
//       / \
//      /   \
//    2-------1
//       Rear
//
// Motor 0 (Front-Right): CCW
// Motor 1 (Rear-Right):  CW
// Motor 2 (Rear-Left):   CCW
// Motor 3 (Front-Left):  CW

/// Motor reaction torque directions for yaw computation.
/// CCW motor creates CW body reaction (-1), CW motor creates CCW body reaction (+1).
/// Diagonal pairs share a direction.
pub const MOTOR_DIRS: [f32; 4] = [-1.0, 1.0, -1.0, 1.0];

/// Number of rotors.
pub const NUM_ROTORS: usize = 4;

// ============================================================================
// Helper Functions
// ============================================================================

/// Clamp a commanded rotor speed into the physically valid range.
#[inline(always)]
pub fn clamp_rotor_speed(speed: f32) -> f32 {
    speed.clamp(MIN_ROTOR_SPEED, MAX_ROTOR_SPEED)
}
