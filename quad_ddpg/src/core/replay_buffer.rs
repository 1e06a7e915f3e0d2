//! Uniform experience replay.
//!
//! A fixed-capacity ring buffer: once full, each new experience overwrites
//! the oldest one. Batches are drawn uniformly without replacement.

use rand::seq::index;
use rand::Rng;

/// One `(s, a, r, s', done)` transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
}

impl Experience {
    pub fn new(
        state: Vec<f32>,
        action: Vec<f32>,
        reward: f32,
        next_state: Vec<f32>,
        done: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}

/// Column-major view of a sampled batch, ready to become tensors.
#[derive(Debug, Clone, Default)]
pub struct ExperienceBatch {
    pub states: Vec<f32>,
    pub actions: Vec<f32>,
    pub rewards: Vec<f32>,
    pub next_states: Vec<f32>,
    /// 1.0 for terminal transitions, 0.0 otherwise
    pub dones: Vec<f32>,
}

impl ExperienceBatch {
    pub fn from_experiences(experiences: &[Experience]) -> Self {
        let mut batch = Self::default();
        for e in experiences {
            batch.states.extend_from_slice(&e.state);
            batch.actions.extend_from_slice(&e.action);
            batch.rewards.push(e.reward);
            batch.next_states.extend_from_slice(&e.next_state);
            batch.dones.push(if e.done { 1.0 } else { 0.0 });
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

pub struct ReplayBuffer {
    storage: Vec<Experience>,
    capacity: usize,
    batch_size: usize,
    /// Slot the next push overwrites once the buffer is full.
    write_pos: usize,
}

impl ReplayBuffer {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize, batch_size: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            storage: Vec::with_capacity(capacity.min(4096)),
            capacity,
            batch_size,
            write_pos: 0,
        }
    }

    pub fn add(&mut self, experience: Experience) {
        if self.storage.len() < self.capacity {
            self.storage.push(experience);
        } else {
            self.storage[self.write_pos] = experience;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    /// `batch_size` distinct experiences, or `None` while too few are stored.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec<Experience>> {
        if self.batch_size == 0 || self.storage.len() < self.batch_size {
            return None;
        }
        let picked = index::sample(rng, self.storage.len(), self.batch_size);
        Some(picked.iter().map(|i| self.storage[i].clone()).collect())
    }

    /// True once more than one batch worth of experiences is stored.
    pub fn is_ready(&self) -> bool {
        self.batch_size > 0 && self.storage.len() > self.batch_size
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn clear(&mut self) {
        self.storage.clear();
        self.write_pos = 0;
    }
}
