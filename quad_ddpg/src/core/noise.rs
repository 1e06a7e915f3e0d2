//! Ornstein-Uhlenbeck exploration noise.
//!
//! Temporally correlated noise that drifts back towards `mu`:
//!
//! ```text
//! x ← x + θ(μ − x) + σ·N(0, 1)
//! ```

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OUNoiseConfig {
    /// Long-run mean
    pub mu: f32,
    /// Mean reversion rate
    pub theta: f32,
    /// Diffusion scale
    pub sigma: f32,
}

impl Default for OUNoiseConfig {
    fn default() -> Self {
        Self {
            mu: 0.0,
            theta: 0.15,
            sigma: 0.2,
        }
    }
}

impl OUNoiseConfig {
    pub fn with_mu(mut self, mu: f32) -> Self {
        self.mu = mu;
        self
    }

    pub fn with_theta(mut self, theta: f32) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = sigma;
        self
    }
}

#[derive(Debug, Clone)]
pub struct OUNoise {
    config: OUNoiseConfig,
    state: Vec<f32>,
}

impl OUNoise {
    pub fn new(size: usize, config: OUNoiseConfig) -> Self {
        Self {
            state: vec![config.mu; size],
            config,
        }
    }

    /// Return the process to its mean.
    pub fn reset(&mut self) {
        self.state.fill(self.config.mu);
    }

    /// Advance one step and return the new state.
    pub fn sample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &[f32] {
        let OUNoiseConfig { mu, theta, sigma } = self.config;
        for x in self.state.iter_mut() {
            let n: f32 = StandardNormal.sample(rng);
            *x += theta * (mu - *x) + sigma * n;
        }
        &self.state
    }

    pub fn state(&self) -> &[f32] {
        &self.state
    }

    pub fn size(&self) -> usize {
        self.state.len()
    }

    pub fn config(&self) -> &OUNoiseConfig {
        &self.config
    }
}
