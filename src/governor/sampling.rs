// Cost-control sampling — send only a fraction of cache misses to the oracle.

use rand::Rng;

/// Source of uniform draws in [0, 1).
pub trait Sampler: Send + Sync {
    fn draw(&self) -> f64;
}

/// Thread-local RNG draws.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn draw(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Always draws the same value. Handy for pinning the sampling decision.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub f64);

impl Sampler for FixedSampler {
    fn draw(&self) -> f64 {
        self.0
    }
}

/// Admit a call with probability `rate`. A rate of 1.0 (or more) admits
/// everything without drawing; 0.0 admits nothing.
pub struct SamplingPolicy {
    rate: f64,
    sampler: Box<dyn Sampler>,
}

impl SamplingPolicy {
    pub fn new(rate: f64, sampler: Box<dyn Sampler>) -> Self {
        Self { rate, sampler }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn admits(&self) -> bool {
        if self.rate >= 1.0 {
            return true;
        }
        self.sampler.draw() < self.rate
    }
}
