//! Actor/critic checkpointing during training.
//!
//! Each save writes a pair of burn records, `actor_{episode:08}.bin` and
//! `critic_{episode:08}.bin`. The best-scoring pair is additionally kept as
//! `actor_best.bin` / `critic_best.bin`, which cleanup never removes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ACTOR_PREFIX: &str = "actor_";
const CRITIC_PREFIX: &str = "critic_";
const EXTENSION: &str = "bin";
const BEST_TAG: &str = "best";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointerConfig {
    /// Directory holding the checkpoint files.
    pub checkpoint_dir: PathBuf,
    /// Episodes between saves.
    pub save_interval: usize,
    /// Number of recent pairs to keep (0 = keep all).
    pub keep_last_n: usize,
    /// Track and save the best-scoring pair.
    pub save_best: bool,
}

impl Default for CheckpointerConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./checkpoints"),
            save_interval: 50,
            keep_last_n: 5,
            save_best: true,
        }
    }
}

impl CheckpointerConfig {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_save_interval(mut self, interval: usize) -> Self {
        self.save_interval = interval;
        self
    }

    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }

    pub fn with_save_best(mut self, save_best: bool) -> Self {
        self.save_best = save_best;
        self
    }
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io error: {0}")]
    Io(#[from] io::Error),

    #[error("recorder error: {0}")]
    Recorder(String),

    #[error("no checkpoints found in {0}")]
    NoCheckpoints(PathBuf),
}

/// Location of a saved actor/critic pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointInfo {
    pub actor_path: PathBuf,
    pub critic_path: PathBuf,
    pub episode: usize,
    /// Score the pair was saved with, if any
    pub metric: Option<f32>,
}

pub struct Checkpointer {
    config: CheckpointerConfig,
    best_metric: f32,
    history: Vec<CheckpointInfo>,
}

impl Checkpointer {
    /// Creates the checkpoint directory if needed.
    pub fn new(config: CheckpointerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(Self {
            config,
            best_metric: f32::NEG_INFINITY,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    pub fn best_metric(&self) -> f32 {
        self.best_metric
    }

    pub fn should_save(&self, episode: usize) -> bool {
        self.config.save_interval > 0 && episode > 0 && episode % self.config.save_interval == 0
    }

    fn path_for(&self, prefix: &str, tag: &str) -> PathBuf {
        self.config
            .checkpoint_dir
            .join(format!("{}{}.{}", prefix, tag, EXTENSION))
    }

    fn pair_paths(&self, episode: usize) -> (PathBuf, PathBuf) {
        let tag = format!("{:08}", episode);
        (self.path_for(ACTOR_PREFIX, &tag), self.path_for(CRITIC_PREFIX, &tag))
    }

    /// Save an actor/critic pair for `episode`; also refreshes the best pair
    /// when `metric` beats every previous one.
    pub fn save<B, A, C>(
        &mut self,
        actor: &A,
        critic: &C,
        episode: usize,
        metric: Option<f32>,
    ) -> Result<CheckpointInfo, CheckpointError>
    where
        B: Backend,
        A: Module<B>,
        C: Module<B>,
    {
        let (actor_path, critic_path) = self.pair_paths(episode);
        save_module::<B, _>(actor, &actor_path)?;
        save_module::<B, _>(critic, &critic_path)?;

        let info = CheckpointInfo {
            actor_path,
            critic_path,
            episode,
            metric,
        };
        self.history.push(info.clone());
        log::debug!("saved checkpoint for episode {}", episode);

        if let Some(m) = metric {
            self.save_best::<B, A, C>(actor, critic, m)?;
        }

        self.cleanup_old_checkpoints();
        Ok(info)
    }

    /// Save as the best pair if `metric` improves on the best seen so far.
    /// Returns whether the pair was written.
    pub fn save_best<B, A, C>(
        &mut self,
        actor: &A,
        critic: &C,
        metric: f32,
    ) -> Result<bool, CheckpointError>
    where
        B: Backend,
        A: Module<B>,
        C: Module<B>,
    {
        if !self.config.save_best || !(metric > self.best_metric) {
            return Ok(false);
        }
        self.best_metric = metric;
        save_module::<B, _>(actor, &self.path_for(ACTOR_PREFIX, BEST_TAG))?;
        save_module::<B, _>(critic, &self.path_for(CRITIC_PREFIX, BEST_TAG))?;
        log::info!("new best checkpoint (score {:.2})", metric);
        Ok(true)
    }

    /// Load a single module record into `template`.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        template: M,
        path: &Path,
        device: &B::Device,
    ) -> Result<M, CheckpointError> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        template
            .load_file(path, &recorder, device)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))
    }

    /// Load the best-scoring pair.
    pub fn load_best<B, A, C>(
        &self,
        actor_template: A,
        critic_template: C,
        device: &B::Device,
    ) -> Result<(A, C), CheckpointError>
    where
        B: Backend,
        A: Module<B>,
        C: Module<B>,
    {
        let actor_path = self.path_for(ACTOR_PREFIX, BEST_TAG);
        let critic_path = self.path_for(CRITIC_PREFIX, BEST_TAG);
        if !actor_path.exists() || !critic_path.exists() {
            return Err(CheckpointError::NoCheckpoints(self.config.checkpoint_dir.clone()));
        }
        Ok((
            self.load::<B, _>(actor_template, &actor_path, device)?,
            self.load::<B, _>(critic_template, &critic_path, device)?,
        ))
    }

    /// Load the pair with the highest episode number.
    pub fn load_latest<B, A, C>(
        &self,
        actor_template: A,
        critic_template: C,
        device: &B::Device,
    ) -> Result<(A, C, usize), CheckpointError>
    where
        B: Backend,
        A: Module<B>,
        C: Module<B>,
    {
        let latest = self
            .list_checkpoints()?
            .pop()
            .ok_or_else(|| CheckpointError::NoCheckpoints(self.config.checkpoint_dir.clone()))?;
        Ok((
            self.load::<B, _>(actor_template, &latest.actor_path, device)?,
            self.load::<B, _>(critic_template, &latest.critic_path, device)?,
            latest.episode,
        ))
    }

    /// Complete pairs on disk, oldest first.
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let mut found: Vec<CheckpointInfo> = fs::read_dir(&self.config.checkpoint_dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                let name = path.file_name()?.to_str()?;
                let episode: usize = name
                    .strip_prefix(ACTOR_PREFIX)?
                    .strip_suffix(".bin")?
                    .parse()
                    .ok()?;
                let (actor_path, critic_path) = self.pair_paths(episode);
                critic_path.exists().then_some(CheckpointInfo {
                    actor_path,
                    critic_path,
                    episode,
                    metric: None,
                })
            })
            .collect();

        found.sort_by_key(|c| c.episode);
        Ok(found)
    }

    fn cleanup_old_checkpoints(&mut self) {
        if self.config.keep_last_n == 0 {
            return;
        }
        while self.history.len() > self.config.keep_last_n {
            let old = self.history.remove(0);
            for path in [&old.actor_path, &old.critic_path] {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("could not remove {}: {}", path.display(), e);
                }
            }
        }
    }
}

fn save_module<B: Backend, M: Module<B>>(module: &M, path: &Path) -> Result<(), CheckpointError> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    module
        .clone()
        .save_file(path, &recorder)
        .map_err(|e| CheckpointError::Recorder(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::{Linear, LinearConfig};
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    fn layer(d_in: usize) -> Linear<TestBackend> {
        LinearConfig::new(d_in, 2).init::<TestBackend>(&Default::default())
    }

    fn weights(l: &Linear<TestBackend>) -> Vec<f32> {
        l.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_checkpointer_config() {
        let config = CheckpointerConfig::new("./ckpts")
            .with_save_interval(25)
            .with_keep_last_n(3)
            .with_save_best(false);
        assert_eq!(config.checkpoint_dir, PathBuf::from("./ckpts"));
        assert_eq!(config.save_interval, 25);
        assert_eq!(config.keep_last_n, 3);
        assert!(!config.save_best);
    }

    #[test]
    fn test_should_save() {
        let dir = tempdir().unwrap();
        let checkpointer =
            Checkpointer::new(CheckpointerConfig::new(dir.path()).with_save_interval(10)).unwrap();
        assert!(!checkpointer.should_save(0));
        assert!(!checkpointer.should_save(5));
        assert!(checkpointer.should_save(10));
        assert!(checkpointer.should_save(30));
    }

    #[test]
    fn test_creates_nested_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        Checkpointer::new(CheckpointerConfig::new(&nested)).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_save_and_load_latest_pair() {
        let dir = tempdir().unwrap();
        let mut checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path())).unwrap();
        let device = Default::default();

        let actor = layer(3);
        let critic = layer(5);
        checkpointer
            .save::<TestBackend, _, _>(&layer(3), &layer(5), 1, None)
            .unwrap();
        checkpointer
            .save::<TestBackend, _, _>(&actor, &critic, 2, None)
            .unwrap();

        let (a, c, episode) = checkpointer
            .load_latest::<TestBackend, _, _>(layer(3), layer(5), &device)
            .unwrap();
        assert_eq!(episode, 2);
        assert_eq!(weights(&a), weights(&actor));
        assert_eq!(weights(&c), weights(&critic));
    }

    #[test]
    fn test_best_pair_tracks_highest_metric() {
        let dir = tempdir().unwrap();
        let mut checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path())).unwrap();
        let device = Default::default();

        let good = layer(3);
        checkpointer
            .save::<TestBackend, _, _>(&good, &layer(4), 1, Some(10.0))
            .unwrap();
        checkpointer
            .save::<TestBackend, _, _>(&layer(3), &layer(4), 2, Some(5.0))
            .unwrap();
        assert_eq!(checkpointer.best_metric(), 10.0);

        let (a, _) = checkpointer
            .load_best::<TestBackend, _, _>(layer(3), layer(4), &device)
            .unwrap();
        assert_eq!(weights(&a), weights(&good));
    }

    #[test]
    fn test_keeps_last_n_pairs() {
        let dir = tempdir().unwrap();
        let mut checkpointer =
            Checkpointer::new(CheckpointerConfig::new(dir.path()).with_keep_last_n(2)).unwrap();
        for episode in 1..=4 {
            checkpointer
                .save::<TestBackend, _, _>(&layer(2), &layer(2), episode, None)
                .unwrap();
        }

        let episodes: Vec<usize> = checkpointer
            .list_checkpoints()
            .unwrap()
            .iter()
            .map(|c| c.episode)
            .collect();
        assert_eq!(episodes, vec![3, 4]);
    }

    #[test]
    fn test_missing_checkpoints() {
        let dir = tempdir().unwrap();
        let checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path())).unwrap();
        let device = Default::default();
        assert!(matches!(
            checkpointer.load_latest::<TestBackend, _, _>(layer(2), layer(2), &device),
            Err(CheckpointError::NoCheckpoints(_))
        ));
        assert!(matches!(
            checkpointer.load_best::<TestBackend, _, _>(layer(2), layer(2), &device),
            Err(CheckpointError::NoCheckpoints(_))
        ));
    }
}
