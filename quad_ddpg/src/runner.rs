//! Episode loop driving a [`DDPGAgent`] through a [`Task`].
//!
//! # Flow
//!
//! ```text
//! for each episode:
//!     state = task.reset();  agent.reset_episode(state)
//!     loop:
//!         action           = agent.act(state, explore = true)
//!         (s', r, done)    = task.step(action)
//!         agent.step(action, r, s', done)   // store + learn when ready
//!         until done
//!     log snapshot, maybe checkpoint, maybe stop early
//! ```
//!
//! [`evaluate`] runs the same loop greedily without touching the replay
//! memory or the networks.

use std::collections::VecDeque;
use std::time::Instant;

use burn::tensor::backend::AutodiffBackend;
use quadcopter_sim::Simulator;
use serde::{Deserialize, Serialize};

use crate::agent::DDPGAgent;
use crate::checkpoint::Checkpointer;
use crate::error::{DdpgError, Result};
use crate::metrics::{EpisodeSnapshot, MetricsLogger};
use crate::task::Task;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Episodes to train for.
    pub num_episodes: usize,

    /// Episodes averaged for the moving score.
    pub score_window: usize,

    /// Stop once the moving average over a full window reaches this score.
    pub target_score: Option<f32>,

    /// Hard cap on agent steps per episode, in case the simulator never ends one.
    pub max_steps_per_episode: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            num_episodes: 1000,
            score_window: 100,
            target_score: None,
            max_steps_per_episode: 10_000,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_episodes(mut self, episodes: usize) -> Self {
        self.num_episodes = episodes;
        self
    }

    pub fn with_score_window(mut self, window: usize) -> Self {
        self.score_window = window;
        self
    }

    pub fn with_target_score(mut self, target: Option<f32>) -> Self {
        self.target_score = target;
        self
    }

    pub fn with_max_steps_per_episode(mut self, steps: usize) -> Self {
        self.max_steps_per_episode = steps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.score_window == 0 {
            return Err(DdpgError::Config("score_window must be positive".to_string()));
        }
        if self.max_steps_per_episode == 0 {
            return Err(DdpgError::Config(
                "max_steps_per_episode must be positive".to_string(),
            ));
        }
        if let Some(target) = self.target_score {
            if !target.is_finite() {
                return Err(DdpgError::Config("target_score must be finite".to_string()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of [`train`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Episodes actually run
    pub episodes: usize,
    pub total_steps: usize,
    pub best_score: f32,
    /// Moving average at the last episode
    pub final_avg_score: f32,
    /// Score of every episode, in order
    pub scores: Vec<f32>,
    /// Whether training stopped on `target_score`
    pub solved: bool,
}

/// One greedy episode from [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeReport {
    pub episode: usize,
    pub score: f32,
    pub steps: usize,
    pub final_pose: [f32; 6],
}

/// Fixed-size moving average of episode scores.
struct ScoreWindow {
    scores: VecDeque<f32>,
    capacity: usize,
}

impl ScoreWindow {
    fn new(capacity: usize) -> Self {
        Self {
            scores: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, score: f32) {
        if self.scores.len() == self.capacity {
            self.scores.pop_front();
        }
        self.scores.push_back(score);
    }

    fn is_full(&self) -> bool {
        self.scores.len() == self.capacity
    }

    fn mean(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f32>() / self.scores.len() as f32
    }
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

// ============================================================================
// Training
// ============================================================================

/// Train `agent` on `task` for `config.num_episodes` episodes.
///
/// Every episode is reported to `logger`. With a checkpointer, an
/// actor/critic pair is written on its save interval (scored by the moving
/// average) and once more when training ends.
pub fn train<B, S>(
    agent: &mut DDPGAgent<B>,
    task: &mut Task<S>,
    config: &RunnerConfig,
    logger: &mut dyn MetricsLogger,
    mut checkpointer: Option<&mut Checkpointer>,
) -> Result<TrainingSummary>
where
    B: AutodiffBackend,
    S: Simulator,
{
    config.validate()?;
    if task.state_size() != agent.state_size() {
        return Err(DdpgError::Dimension {
            name: "state",
            expected: agent.state_size(),
            actual: task.state_size(),
        });
    }
    if task.action_size() != agent.action_size() {
        return Err(DdpgError::Dimension {
            name: "action",
            expected: agent.action_size(),
            actual: task.action_size(),
        });
    }

    log::info!(
        "training for {} episodes (state {}, action {})",
        config.num_episodes,
        agent.state_size(),
        agent.action_size()
    );

    let start = Instant::now();
    let mut window = ScoreWindow::new(config.score_window);
    let mut scores = Vec::with_capacity(config.num_episodes);
    let mut best_score = f32::NEG_INFINITY;
    let mut total_steps = 0;
    let mut solved = false;

    for episode in 1..=config.num_episodes {
        let mut state = task.reset();
        agent.reset_episode(&state);

        let mut score = 0.0;
        let mut steps = 0;
        let mut critic_losses = Vec::new();
        let mut actor_losses = Vec::new();

        loop {
            let action = agent.act(&state, true)?;
            let outcome = task.step(&action)?;
            let truncated = steps + 1 >= config.max_steps_per_episode;

            if let Some(stats) = agent.step(&action, outcome.reward, &outcome.next_state, outcome.done)? {
                critic_losses.push(stats.critic_loss);
                actor_losses.push(stats.actor_loss);
            }

            score += outcome.reward;
            steps += 1;
            state = outcome.next_state;

            if outcome.done || truncated {
                break;
            }
        }
        total_steps += steps;

        window.push(score);
        scores.push(score);
        best_score = best_score.max(score);
        let avg_score = window.mean();

        let snapshot = EpisodeSnapshot::new(episode, steps, total_steps, score)
            .with_scores(avg_score, best_score)
            .with_losses(mean(&critic_losses), mean(&actor_losses))
            .with_final_pose(task.sim().pose());
        logger.log(&snapshot);

        if let Some(ckpt) = checkpointer.as_deref_mut() {
            if ckpt.should_save(episode) {
                ckpt.save::<B, _, _>(
                    agent.actor().model(),
                    agent.critic().model(),
                    episode,
                    Some(avg_score),
                )?;
            }
        }

        if let Some(target) = config.target_score {
            if window.is_full() && avg_score >= target {
                log::info!(
                    "reached average score {:.2} >= {:.2} after {} episodes",
                    avg_score,
                    target,
                    episode
                );
                solved = true;
                break;
            }
        }
    }

    let episodes = scores.len();
    if let Some(ckpt) = checkpointer {
        if episodes > 0 && !ckpt.should_save(episodes) {
            ckpt.save::<B, _, _>(
                agent.actor().model(),
                agent.critic().model(),
                episodes,
                Some(window.mean()),
            )?;
        }
    }
    logger.flush();

    log::info!(
        "training finished: {} episodes, {} steps, best {:.2}, avg {:.2} in {:.1}s",
        episodes,
        total_steps,
        best_score,
        window.mean(),
        start.elapsed().as_secs_f32()
    );

    Ok(TrainingSummary {
        episodes,
        total_steps,
        best_score,
        final_avg_score: window.mean(),
        scores,
        solved,
    })
}

// ============================================================================
// Evaluation
// ============================================================================

/// Run `episodes` greedy episodes. Nothing is stored or learned.
pub fn evaluate<B, S>(
    agent: &mut DDPGAgent<B>,
    task: &mut Task<S>,
    episodes: usize,
    max_steps_per_episode: usize,
) -> Result<Vec<EpisodeReport>>
where
    B: AutodiffBackend,
    S: Simulator,
{
    let max_steps = max_steps_per_episode.max(1);
    let mut reports = Vec::with_capacity(episodes);

    for episode in 1..=episodes {
        let mut state = task.reset();
        let mut score = 0.0;
        let mut steps = 0;

        loop {
            let action = agent.act(&state, false)?;
            let outcome = task.step(&action)?;
            score += outcome.reward;
            steps += 1;
            state = outcome.next_state;
            if outcome.done || steps >= max_steps {
                break;
            }
        }

        let report = EpisodeReport {
            episode,
            score,
            steps,
            final_pose: task.sim().pose(),
        };
        log::info!(
            "eval episode {}: score {:.2} in {} steps, final z {:.2}",
            report.episode,
            report.score,
            report.steps,
            report.final_pose[2]
        );
        reports.push(report);
    }

    Ok(reports)
}
