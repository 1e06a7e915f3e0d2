//! Task wrapper around a physics simulator.
//!
//! A [`Task`] turns raw simulator timesteps into `(state, reward, done)`
//! transitions. Every chosen action (four rotor speeds) is held for
//! `action_repeat` integration steps; the pose after each of those steps is
//! stacked into the next state, so the state is `action_repeat * 6` wide.
//!
//! # Reward
//!
//! Evaluated after each substep from the current pose `p` and velocity `v`:
//!
//! ```text
//! reward  = flight_bonus + (near_target_bonus if |p_xyz - target| < near_target_radius)
//! penalty = Σ|euler| + altitude_weight * (z - target_z)^2 + |Σ|p_xyz - target| - Σ|v||
//! return    reward - penalty * penalty_scale
//! ```
//!
//! The step reward is the sum over the substeps.

use quadcopter_sim::{PhysicsSim, SimConfig, Simulator};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Number of pose components reported per substep.
pub const POSE_SIZE: usize = 6;

/// Coefficients of the shaped reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Distance under which the near-target bonus is paid (m)
    pub near_target_radius: f32,
    /// Bonus for being within `near_target_radius`
    pub near_target_bonus: f32,
    /// Constant reward for staying airborne
    pub flight_bonus: f32,
    /// Weight of the squared altitude error
    pub altitude_weight: f32,
    /// Scale applied to the summed penalty
    pub penalty_scale: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            near_target_radius: 3.0,
            near_target_bonus: 1000.0,
            flight_bonus: 100.0,
            altitude_weight: 10.0,
            penalty_scale: 0.002,
        }
    }
}

/// Task configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Simulator settings (initial conditions, runtime, bounds)
    pub sim: SimConfig,
    /// Target position [x, y, z]
    pub target_pos: [f32; 3],
    /// Integration steps per action
    pub action_repeat: usize,
    /// Lowest rotor speed the agent may command (rev/s)
    pub action_low: f32,
    /// Highest rotor speed the agent may command (rev/s)
    pub action_high: f32,
    /// Reward coefficients
    pub reward: RewardConfig,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            target_pos: [0.0, 0.0, 10.0],
            action_repeat: 3,
            action_low: 0.0,
            action_high: 500.0,
            reward: RewardConfig::default(),
        }
    }
}

impl TaskConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulator config.
    pub fn with_sim(mut self, sim: SimConfig) -> Self {
        self.sim = sim;
        self
    }

    /// Set the target position.
    pub fn with_target_pos(mut self, target: [f32; 3]) -> Self {
        self.target_pos = target;
        self
    }

    /// Set the number of integration steps per action.
    pub fn with_action_repeat(mut self, repeat: usize) -> Self {
        self.action_repeat = repeat;
        self
    }

    /// Set the rotor speed range.
    pub fn with_action_range(mut self, low: f32, high: f32) -> Self {
        self.action_low = low;
        self.action_high = high;
        self
    }

    /// Set the reward coefficients.
    pub fn with_reward(mut self, reward: RewardConfig) -> Self {
        self.reward = reward;
        self
    }

    /// Validate the configuration (simulator settings included).
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.action_repeat == 0 {
            return Err(TaskError::InvalidConfig(
                "action_repeat must be at least 1".to_string(),
            ));
        }
        if !(self.action_low < self.action_high) {
            return Err(TaskError::InvalidConfig(format!(
                "action_low ({}) must be below action_high ({})",
                self.action_low, self.action_high
            )));
        }
        if self.target_pos.iter().any(|v| !v.is_finite()) {
            return Err(TaskError::InvalidConfig("target_pos must be finite".to_string()));
        }
        self.sim.validate()?;
        Ok(())
    }
}

/// Result of one [`Task::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStep {
    /// Stacked poses, `action_repeat * 6` values
    pub next_state: Vec<f32>,
    /// Reward summed over the substeps
    pub reward: f32,
    /// Simulator done flag after the last substep
    pub done: bool,
}

/// Reinforcement-learning task over a [`Simulator`].
#[derive(Debug, Clone)]
pub struct Task<S: Simulator = PhysicsSim> {
    sim: S,
    action_repeat: usize,
    state_size: usize,
    action_low: f32,
    action_high: f32,
    action_size: usize,
    target_pos: [f32; 3],
    reward: RewardConfig,
}

impl Task<PhysicsSim> {
    /// Build a task around the bundled rigid-body simulator.
    pub fn from_config(config: TaskConfig) -> Result<Self, TaskError> {
        config.validate()?;
        let sim = PhysicsSim::new(config.sim.clone())?;
        Self::new(sim, config)
    }
}

impl<S: Simulator> Task<S> {
    /// Wrap an existing simulator. The `sim` section of `config` is ignored.
    pub fn new(sim: S, config: TaskConfig) -> Result<Self, TaskError> {
        if config.action_repeat == 0 {
            return Err(TaskError::InvalidConfig(
                "action_repeat must be at least 1".to_string(),
            ));
        }
        if !(config.action_low < config.action_high) {
            return Err(TaskError::InvalidConfig(format!(
                "action_low ({}) must be below action_high ({})",
                config.action_low, config.action_high
            )));
        }

        Ok(Self {
            sim,
            action_repeat: config.action_repeat,
            state_size: config.action_repeat * POSE_SIZE,
            action_low: config.action_low,
            action_high: config.action_high,
            action_size: quadcopter_sim::NUM_ROTORS,
            target_pos: config.target_pos,
            reward: config.reward,
        })
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    pub fn action_size(&self) -> usize {
        self.action_size
    }

    pub fn action_low(&self) -> f32 {
        self.action_low
    }

    pub fn action_high(&self) -> f32 {
        self.action_high
    }

    pub fn action_repeat(&self) -> usize {
        self.action_repeat
    }

    pub fn target_pos(&self) -> [f32; 3] {
        self.target_pos
    }

    /// Read access to the wrapped simulator.
    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// Reward for the simulator's current pose and velocity.
    pub fn get_reward(&self) -> f32 {
        let pose = self.sim.pose();
        let velocity = self.sim.velocity();
        let r = &self.reward;

        let mut distance_sq = 0.0;
        let mut abs_error_sum = 0.0;
        for i in 0..3 {
            let d = pose[i] - self.target_pos[i];
            distance_sq += d * d;
            abs_error_sum += d.abs();
        }

        let mut reward = r.flight_bonus;
        if distance_sq.sqrt() < r.near_target_radius {
            reward += r.near_target_bonus;
        }

        let attitude: f32 = pose[3..POSE_SIZE].iter().map(|a| a.abs()).sum();
        let altitude_error = pose[2] - self.target_pos[2];
        let speed: f32 = velocity.iter().map(|v| v.abs()).sum();

        let penalty = attitude
            + r.altitude_weight * altitude_error * altitude_error
            + (abs_error_sum - speed).abs();

        reward - penalty * r.penalty_scale
    }

    fn check_action(&self, rotor_speeds: &[f32]) -> Result<(), TaskError> {
        if rotor_speeds.len() != self.action_size {
            return Err(TaskError::ActionSize {
                expected: self.action_size,
                actual: rotor_speeds.len(),
            });
        }
        if let Some(index) = rotor_speeds.iter().position(|v| !v.is_finite()) {
            return Err(TaskError::NonFiniteAction { index });
        }
        Ok(())
    }

    /// Hold `rotor_speeds` for `action_repeat` integration steps.
    pub fn step(&mut self, rotor_speeds: &[f32]) -> Result<TaskStep, TaskError> {
        self.check_action(rotor_speeds)?;

        let mut reward = 0.0;
        let mut done = false;
        let mut next_state = Vec::with_capacity(self.state_size);

        for _ in 0..self.action_repeat {
            done = self.sim.next_timestep(rotor_speeds)?;
            reward += self.get_reward();
            next_state.extend_from_slice(&self.sim.pose());
        }

        Ok(TaskStep {
            next_state,
            reward,
            done,
        })
    }

    /// Reset the simulator and return the initial pose repeated `action_repeat` times.
    pub fn reset(&mut self) -> Vec<f32> {
        self.sim.reset();
        let pose = self.sim.pose();
        let mut state = Vec::with_capacity(self.state_size);
        for _ in 0..self.action_repeat {
            state.extend_from_slice(&pose);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadcopter_sim::SimError;

    /// Simulator whose pose and velocity are scripted by the test.
    #[derive(Debug, Clone)]
    struct ScriptedSim {
        pose: [f32; 6],
        velocity: [f32; 3],
        climb_per_step: f32,
        steps: usize,
        done_after: usize,
        initial_pose: [f32; 6],
    }

    impl ScriptedSim {
        fn new(pose: [f32; 6]) -> Self {
            Self {
                pose,
                velocity: [0.0; 3],
                climb_per_step: 0.0,
                steps: 0,
                done_after: usize::MAX,
                initial_pose: pose,
            }
        }
    }

    impl Simulator for ScriptedSim {
        fn pose(&self) -> [f32; 6] {
            self.pose
        }
        fn velocity(&self) -> [f32; 3] {
            self.velocity
        }
        fn angular_velocity(&self) -> [f32; 3] {
            [0.0; 3]
        }
        fn time(&self) -> f32 {
            self.steps as f32 * 0.02
        }
        fn runtime(&self) -> f32 {
            5.0
        }
        fn is_done(&self) -> bool {
            self.steps >= self.done_after
        }
        fn next_timestep(&mut self, _rotor_speeds: &[f32]) -> Result<bool, SimError> {
            self.steps += 1;
            self.pose[2] += self.climb_per_step;
            Ok(self.is_done())
        }
        fn reset(&mut self) {
            self.pose = self.initial_pose;
            self.steps = 0;
        }
    }

    fn scripted_task(pose: [f32; 6]) -> Task<ScriptedSim> {
        Task::new(ScriptedSim::new(pose), TaskConfig::default()).unwrap()
    }

    #[test]
    fn test_default_dimensions() {
        let task = Task::from_config(TaskConfig::default()).unwrap();
        assert_eq!(task.action_repeat(), 3);
        assert_eq!(task.state_size(), 18);
        assert_eq!(task.action_size(), 4);
        assert_eq!(task.action_low(), 0.0);
        assert_eq!(task.action_high(), 500.0);
        assert_eq!(task.target_pos(), [0.0, 0.0, 10.0]);
    }

    #[test]
    fn test_reward_at_target_is_maximal() {
        let task = scripted_task([0.0, 0.0, 10.0, 0.0, 0.0, 0.0]);
        assert!((task.get_reward() - 1100.0).abs() < 1e-4);
    }

    #[test]
    fn test_reward_without_near_target_bonus() {
        // 5 m below target, level, at rest:
        // penalty = 0 + 10 * 25 + |5 - 0| = 255
        let task = scripted_task([0.0, 0.0, 5.0, 0.0, 0.0, 0.0]);
        let expected = 100.0 - 255.0 * 0.002;
        assert!((task.get_reward() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_reward_penalizes_attitude_and_speed_mismatch() {
        let mut sim = ScriptedSim::new([1.0, 0.0, 10.0, 0.1, -0.2, 0.3]);
        sim.velocity = [0.0, 0.0, -3.0];
        let task = Task::new(sim, TaskConfig::default()).unwrap();
        // penalty = 0.6 + 0 + |1 - 3| = 2.6, within 3 m of target
        let expected = 1100.0 - 2.6 * 0.002;
        assert!((task.get_reward() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_step_stacks_poses_and_sums_rewards() {
        let mut sim = ScriptedSim::new([0.0, 0.0, 10.0, 0.0, 0.0, 0.0]);
        sim.climb_per_step = 1.0;
        let mut task = Task::new(sim, TaskConfig::default()).unwrap();

        let step = task.step(&[400.0; 4]).unwrap();

        assert_eq!(step.next_state.len(), 18);
        assert_eq!(step.next_state[2], 11.0);
        assert_eq!(step.next_state[8], 12.0);
        assert_eq!(step.next_state[14], 13.0);
        assert!(!step.done);

        // Sum of the per-substep rewards at z = 11, 12, 13; 3 m is outside the bonus radius
        let penalty = |dz: f32| (10.0 * dz * dz + dz) * 0.002;
        let expected =
            (1100.0 - penalty(1.0)) + (1100.0 - penalty(2.0)) + (100.0 - penalty(3.0));
        assert!((step.reward - expected).abs() < 1e-3);
    }

    #[test]
    fn test_step_reports_done_from_last_substep() {
        let mut sim = ScriptedSim::new([0.0, 0.0, 10.0, 0.0, 0.0, 0.0]);
        sim.done_after = 2;
        let mut task = Task::new(sim, TaskConfig::default()).unwrap();

        let step = task.step(&[400.0; 4]).unwrap();
        assert!(step.done);
        assert_eq!(step.next_state.len(), 18);
        assert_eq!(task.sim().steps, 3);
    }

    #[test]
    fn test_reset_repeats_pose() {
        let mut sim = ScriptedSim::new([1.0, 2.0, 3.0, 0.0, 0.0, 0.5]);
        sim.climb_per_step = 1.0;
        let mut task = Task::new(sim, TaskConfig::default()).unwrap();
        task.step(&[400.0; 4]).unwrap();

        let state = task.reset();
        assert_eq!(state.len(), 18);
        for chunk in state.chunks(POSE_SIZE) {
            assert_eq!(chunk, &[1.0, 2.0, 3.0, 0.0, 0.0, 0.5]);
        }
    }

    #[test]
    fn test_rejects_wrong_action_size() {
        let mut task = scripted_task([0.0; 6]);
        assert_eq!(
            task.step(&[1.0, 2.0]).unwrap_err(),
            TaskError::ActionSize {
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn test_rejects_non_finite_action() {
        let mut task = scripted_task([0.0; 6]);
        assert_eq!(
            task.step(&[1.0, 2.0, f32::INFINITY, 0.0]).unwrap_err(),
            TaskError::NonFiniteAction { index: 2 }
        );
    }

    #[test]
    fn test_rejects_zero_action_repeat() {
        let config = TaskConfig::default().with_action_repeat(0);
        assert!(Task::from_config(config).is_err());
    }

    #[test]
    fn test_custom_action_repeat_changes_state_size() {
        let config = TaskConfig::default().with_action_repeat(5);
        let mut task = Task::from_config(config).unwrap();
        assert_eq!(task.state_size(), 30);
        assert_eq!(task.reset().len(), 30);
        assert_eq!(task.step(&[404.0; 4]).unwrap().next_state.len(), 30);
    }
}
