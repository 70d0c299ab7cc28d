//! Random sub-sampling of grid cells ahead of any read

use rand::Rng;

use crate::tiff::errors::{PatchError, PatchResult};

/// Independent Bernoulli gate with a fixed admission rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    rate: f64,
}

impl Sampler {
    /// `rate` must lie in (0, 1]; anything else (NaN included) is a
    /// configuration error
    pub fn new(rate: f64) -> PatchResult<Self> {
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(PatchError::Configuration(format!(
                "Invalid sampling rate: {} (must be in (0, 1])", rate
            )));
        }
        Ok(Sampler { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// One draw; a rate of 1 admits without consuming randomness
    pub fn admit<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if self.rate >= 1.0 {
            return true;
        }
        rng.gen_bool(self.rate)
    }

    /// Draws `count` decisions in order
    pub fn decisions<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<bool> {
        (0..count).map(|_| self.admit(rng)).collect()
    }
}
