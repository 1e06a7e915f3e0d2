//! Per-episode training loggers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Summary of one finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSnapshot {
    /// 1-based episode index
    pub episode: usize,
    /// Agent steps taken this episode
    pub steps: usize,
    /// Agent steps across all episodes so far
    pub total_steps: usize,
    /// Reward summed over the episode
    pub score: f32,
    /// Moving average of recent scores
    pub avg_score: f32,
    /// Best single-episode score so far
    pub best_score: f32,
    /// Mean critic loss over this episode's learning steps
    pub critic_loss: Option<f32>,
    /// Mean actor loss over this episode's learning steps
    pub actor_loss: Option<f32>,
    /// Pose at the end of the episode
    pub final_pose: [f32; 6],
}

impl EpisodeSnapshot {
    pub fn new(episode: usize, steps: usize, total_steps: usize, score: f32) -> Self {
        Self {
            episode,
            steps,
            total_steps,
            score,
            avg_score: score,
            best_score: score,
            critic_loss: None,
            actor_loss: None,
            final_pose: [0.0; 6],
        }
    }

    pub fn with_scores(mut self, avg_score: f32, best_score: f32) -> Self {
        self.avg_score = avg_score;
        self.best_score = best_score;
        self
    }

    pub fn with_losses(mut self, critic_loss: Option<f32>, actor_loss: Option<f32>) -> Self {
        self.critic_loss = critic_loss;
        self.actor_loss = actor_loss;
        self
    }

    pub fn with_final_pose(mut self, pose: [f32; 6]) -> Self {
        self.final_pose = pose;
        self
    }
}

/// Sink for episode snapshots.
pub trait MetricsLogger: Send {
    fn log(&mut self, snapshot: &EpisodeSnapshot);

    fn flush(&mut self);
}

// ============================================================================
// Console
// ============================================================================

/// Writes a one-line summary every `log_interval` episodes through `log`.
pub struct ConsoleLogger {
    log_interval: usize,
    start_time: Instant,
}

impl ConsoleLogger {
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
            start_time: Instant::now(),
        }
    }

    pub fn reset_timer(&mut self) {
        self.start_time = Instant::now();
    }

    fn should_log(&self, episode: usize) -> bool {
        episode % self.log_interval == 0
    }
}

fn format_loss(loss: Option<f32>) -> String {
    loss.map(|l| format!("{:.4}", l)).unwrap_or_else(|| "-".to_string())
}

impl MetricsLogger for ConsoleLogger {
    fn log(&mut self, snapshot: &EpisodeSnapshot) {
        if !self.should_log(snapshot.episode) {
            return;
        }

        let elapsed = self.start_time.elapsed().as_secs_f32();
        let sps = if elapsed > 0.0 {
            snapshot.total_steps as f32 / elapsed
        } else {
            0.0
        };
        let [x, y, z, ..] = snapshot.final_pose;

        log::info!(
            "episode {:>5} | score {:>9.2} | avg {:>9.2} | best {:>9.2} | steps {:>4} | critic {} | actor {} | pos ({:.1}, {:.1}, {:.1}) | {:.0} steps/s",
            snapshot.episode,
            snapshot.score,
            snapshot.avg_score,
            snapshot.best_score,
            snapshot.steps,
            format_loss(snapshot.critic_loss),
            format_loss(snapshot.actor_loss),
            x,
            y,
            z,
            sps
        );
    }

    fn flush(&mut self) {}
}

// ============================================================================
// CSV
// ============================================================================

/// One CSV row per episode.
pub struct CSVLogger {
    writer: BufWriter<File>,
    start_time: Instant,
}

impl CSVLogger {
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(
            writer,
            "episode,steps,total_steps,score,avg_score,best_score,critic_loss,actor_loss,x,y,z,roll,pitch,yaw,elapsed_secs"
        )?;

        Ok(Self {
            writer,
            start_time: Instant::now(),
        })
    }
}

impl MetricsLogger for CSVLogger {
    fn log(&mut self, snapshot: &EpisodeSnapshot) {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        let loss = |l: Option<f32>| l.map(|v| format!("{:.6}", v)).unwrap_or_default();
        let pose = snapshot
            .final_pose
            .iter()
            .map(|v| format!("{:.4}", v))
            .collect::<Vec<_>>()
            .join(",");

        if let Err(e) = writeln!(
            self.writer,
            "{},{},{},{:.4},{:.4},{:.4},{},{},{},{:.2}",
            snapshot.episode,
            snapshot.steps,
            snapshot.total_steps,
            snapshot.score,
            snapshot.avg_score,
            snapshot.best_score,
            loss(snapshot.critic_loss),
            loss(snapshot.actor_loss),
            pose,
            elapsed
        ) {
            log::warn!("failed to write CSV row: {}", e);
        }
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CSVLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

// ============================================================================
// Fan-out
// ============================================================================

#[derive(Default)]
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl MetricsLogger for MultiLogger {
    fn log(&mut self, snapshot: &EpisodeSnapshot) {
        for logger in &mut self.loggers {
            logger.log(snapshot);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}
