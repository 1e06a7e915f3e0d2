//! Episode loop tests.
//!
//! These tests define:
//! - A training run reports every episode and accumulates steps
//! - Training stops early on the target score
//! - Evaluation neither stores nor learns
//! - Checkpoints written during training restore the same policy

use tempfile::tempdir;

use super::{small_config, TestBackend};
use crate::agent::DDPGAgent;
use crate::checkpoint::{Checkpointer, CheckpointerConfig};
use crate::error::DdpgError;
use crate::metrics::{EpisodeSnapshot, MetricsLogger};
use crate::runner::{evaluate, train, RunnerConfig};
use crate::task::{Task, TaskConfig};

/// Keeps every snapshot it is given.
#[derive(Default)]
struct RecordingLogger {
    snapshots: Vec<EpisodeSnapshot>,
    flushed: bool,
}

impl MetricsLogger for RecordingLogger {
    fn log(&mut self, snapshot: &EpisodeSnapshot) {
        self.snapshots.push(snapshot.clone());
    }

    fn flush(&mut self) {
        self.flushed = true;
    }
}

fn setup() -> (DDPGAgent<TestBackend>, Task) {
    let config = small_config();
    let agent = DDPGAgent::from_training_config(&config, &Default::default()).unwrap();
    let task = Task::from_config(config.task).unwrap();
    (agent, task)
}

#[test]
fn should_train_for_configured_episodes() {
    let (mut agent, mut task) = setup();
    let mut logger = RecordingLogger::default();
    let runner = small_config().runner;

    let summary = train(&mut agent, &mut task, &runner, &mut logger, None).unwrap();

    assert_eq!(summary.episodes, 3);
    assert_eq!(summary.scores.len(), 3);
    assert!(!summary.solved);
    assert!(summary.total_steps >= 3);
    assert_eq!(agent.memory().len(), summary.total_steps);
    // six agent steps per episode fill the batch during the first episode
    assert!(agent.learn_steps() > 0);

    assert_eq!(logger.snapshots.len(), 3);
    assert!(logger.flushed);
    let last = logger.snapshots.last().unwrap();
    assert_eq!(last.episode, 3);
    assert_eq!(last.total_steps, summary.total_steps);
    assert!(last.critic_loss.is_some());
    let best = summary.scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    assert_eq!(summary.best_score, best);
    let window_avg = (summary.scores[1] + summary.scores[2]) / 2.0;
    assert!((summary.final_avg_score - window_avg).abs() < 1e-3);
}

#[test]
fn should_stop_when_target_score_reached() {
    let (mut agent, mut task) = setup();
    let mut logger = RecordingLogger::default();
    let runner = RunnerConfig::default()
        .with_num_episodes(10)
        .with_score_window(2)
        .with_target_score(Some(f32::MIN));

    let summary = train(&mut agent, &mut task, &runner, &mut logger, None).unwrap();

    // the window needs two scores before it counts
    assert!(summary.solved);
    assert_eq!(summary.episodes, 2);
    assert_eq!(logger.snapshots.len(), 2);
}

#[test]
fn should_cap_episode_length() {
    let (mut agent, mut task) = setup();
    let mut logger = RecordingLogger::default();
    let runner = RunnerConfig::default()
        .with_num_episodes(2)
        .with_max_steps_per_episode(2);

    let summary = train(&mut agent, &mut task, &runner, &mut logger, None).unwrap();
    assert_eq!(summary.total_steps, 4);
    assert!(logger.snapshots.iter().all(|s| s.steps == 2));
}

#[test]
fn should_reject_task_with_different_state_size() {
    let (mut agent, _) = setup();
    let mut task = Task::from_config(
        small_config().task.with_action_repeat(2),
    )
    .unwrap();
    let mut logger = RecordingLogger::default();

    let result = train(&mut agent, &mut task, &small_config().runner, &mut logger, None);
    assert!(matches!(
        result,
        Err(DdpgError::Dimension { name: "state", expected: 18, actual: 12 })
    ));
}

#[test]
fn should_evaluate_without_learning() {
    let (mut agent, mut task) = setup();
    let mut logger = RecordingLogger::default();
    train(&mut agent, &mut task, &small_config().runner, &mut logger, None).unwrap();

    let stored = agent.memory().len();
    let learned = agent.learn_steps();

    let reports = evaluate(&mut agent, &mut task, 2, 1000).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(agent.memory().len(), stored);
    assert_eq!(agent.learn_steps(), learned);

    // greedy episodes from the same start are identical
    assert_eq!(reports[0].score, reports[1].score);
    assert_eq!(reports[0].steps, reports[1].steps);
    assert_eq!(reports[0].final_pose, reports[1].final_pose);
}

#[test]
fn should_restore_policy_from_checkpoint() {
    let dir = tempdir().unwrap();
    let mut checkpointer =
        Checkpointer::new(CheckpointerConfig::new(dir.path()).with_save_interval(2)).unwrap();

    let (mut agent, mut task) = setup();
    let mut logger = RecordingLogger::default();
    train(
        &mut agent,
        &mut task,
        &small_config().runner,
        &mut logger,
        Some(&mut checkpointer),
    )
    .unwrap();

    // interval save at episode 2, final save at episode 3
    let episodes: Vec<usize> = checkpointer
        .list_checkpoints()
        .unwrap()
        .iter()
        .map(|c| c.episode)
        .collect();
    assert_eq!(episodes, vec![2, 3]);

    let config = small_config();
    let device = Default::default();
    let (actor, critic, episode) = checkpointer
        .load_latest::<TestBackend, _, _>(
            config.actor_config().init::<TestBackend>(&device),
            config.critic_config().init::<TestBackend>(&device),
            &device,
        )
        .unwrap();
    assert_eq!(episode, 3);

    let mut restored = DDPGAgent::<TestBackend>::from_training_config(&config, &device).unwrap();
    restored.load_models(actor, critic);

    let state = task.reset();
    let expected = agent.act(&state, false).unwrap();
    let actual = restored.act(&state, false).unwrap();
    for (e, a) in expected.iter().zip(actual.iter()) {
        assert!((e - a).abs() < 1e-3, "expected {} got {}", e, a);
    }
}

#[test]
fn should_train_with_default_task_dimensions() {
    let config = small_config().with_task(TaskConfig::default().with_action_repeat(1));
    let device = Default::default();
    let mut agent = DDPGAgent::<TestBackend>::from_training_config(&config, &device).unwrap();
    let mut task = Task::from_config(config.task.clone()).unwrap();
    let runner = RunnerConfig::default()
        .with_num_episodes(1)
        .with_max_steps_per_episode(10);
    let mut logger = RecordingLogger::default();

    let summary = train(&mut agent, &mut task, &runner, &mut logger, None).unwrap();
    assert_eq!(agent.state_size(), 6);
    assert_eq!(summary.total_steps, 10);
}
