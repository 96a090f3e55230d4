use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Noise distribution and scale used to release a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NoiseScale {
    /// Zero-mean Laplace noise with the given scale `b`.
    Laplace(f64),
}

/// Source of Laplace noise for released counts.
///
/// A sanitize call owns exactly one mechanism, and every draw of that call
/// comes from its generator, in a fixed order. Seeding is always explicit so
/// releases can be reproduced.
#[derive(Debug, Clone)]
pub struct LaplaceMechanism<R = ChaCha20Rng> {
    rng: R,
}

impl LaplaceMechanism<ChaCha20Rng> {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<R: RngCore> LaplaceMechanism<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draws one sample of the given noise distribution. A zero scale
    /// yields no noise.
    pub fn sample(&mut self, noise: NoiseScale) -> f64 {
        let NoiseScale::Laplace(scale) = noise;
        if scale == 0.0 {
            return 0.0;
        }

        // Inverse CDF of Laplace(0, b). Exact endpoints of the uniform draw
        // would give ln(0), so 0 is nudged up.
        let mut u01: f64 = self.rng.gen();
        if u01 == 0.0 {
            u01 = f64::MIN_POSITIVE;
        }
        let u = u01 - 0.5;
        -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
    }

    /// Adds one independent Laplace draw per scale to `value`.
    pub fn add_noise(&mut self, value: f64, scales: &[f64]) -> f64 {
        scales
            .iter()
            .fold(value, |noised, scale| noised + self.sample(NoiseScale::Laplace(*scale)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_noise() {
        let mut a = LaplaceMechanism::from_seed(7);
        let mut b = LaplaceMechanism::from_seed(7);
        let mut c = LaplaceMechanism::from_seed(8);

        let draws_a: Vec<f64> = (0..5).map(|_| a.sample(NoiseScale::Laplace(2.0))).collect();
        let draws_b: Vec<f64> = (0..5).map(|_| b.sample(NoiseScale::Laplace(2.0))).collect();
        let draws_c: Vec<f64> = (0..5).map(|_| c.sample(NoiseScale::Laplace(2.0))).collect();

        assert_eq!(draws_a, draws_b);
        assert_ne!(draws_a, draws_c);
        assert!(draws_a.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_zero_scale_is_noiseless() {
        let mut mechanism = LaplaceMechanism::from_seed(1);
        assert_eq!(mechanism.sample(NoiseScale::Laplace(0.0)), 0.0);
        assert_eq!(mechanism.add_noise(42.0, &[]), 42.0);
        assert_eq!(mechanism.add_noise(42.0, &[0.0, 0.0]), 42.0);
    }

    #[test]
    fn test_laplace_moments() {
        // For Laplace(0, b): E[X] = 0 and E[|X|] = b.
        let scale = 3.0;
        let n = 20_000;
        let mut mechanism = LaplaceMechanism::from_seed(2024);
        let draws: Vec<f64> = (0..n)
            .map(|_| mechanism.sample(NoiseScale::Laplace(scale)))
            .collect();

        let mean = draws.iter().sum::<f64>() / n as f64;
        let mean_abs = draws.iter().map(|x| x.abs()).sum::<f64>() / n as f64;

        assert!(mean.abs() < 0.15, "mean {mean}");
        assert!((mean_abs - scale).abs() < 0.15, "mean |x| {mean_abs}");
    }
}
