//! Reproducible benchmark input.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default seed for generated samples.
pub const DEFAULT_SEED: u64 = 42;

/// Immutable sequence of `f32` values shared by the host and device paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    values: Vec<f32>,
}

impl Sample {
    /// Generate `len` values uniformly distributed in `[-1.0, 1.0)`.
    ///
    /// The same `(len, seed)` pair always yields the same sample, so
    /// roughly half of the values are positive.
    pub fn random(len: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..len).map(|_| rng.gen_range(-1.0f32..1.0f32)).collect();
        Sample { values }
    }

    /// Wrap caller-provided values.
    pub fn from_vec(values: Vec<f32>) -> Self {
        Sample { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
