//! Random number generation, on top of the "rand" crate with a xoshiro engine

use crate::numeric::{reals::consts::PI, Float};
use rand::{Rng, SeedableRng};

// Select random number generation engine in use
#[cfg(feature = "f32")]
type Engine = rand_xoshiro::Xoshiro128Plus;
#[cfg(not(feature = "f32"))]
type Engine = rand_xoshiro::Xoshiro256Plus;

/// Facade over the random number generation engine
#[derive(Clone, Debug)]
pub struct RandomGenerator {
    rng: Engine,
}
//
impl RandomGenerator {
    /// Spawn a new random number generator from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Engine::seed_from_u64(seed),
        }
    }

    /// Generate a random floating-point number between 0 and 1
    pub fn random(&mut self) -> Float {
        self.rng.gen()
    }

    /// Generate a random floating-point number between `low` and `high`
    pub fn uniform(&mut self, low: Float, high: Float) -> Float {
        low + (high - low) * self.random()
    }

    /// Generate an exponentially distributed number of given mean
    pub fn exponential(&mut self, mean: Float) -> Float {
        // 1 - random() lies in (0, 1], so the logarithm stays finite
        -mean * (1. - self.random()).ln()
    }

    /// Generate a uniformly distributed integer in `low..=high`
    pub fn int_in(&mut self, low: i32, high: i32) -> i32 {
        self.rng.gen_range(low..=high)
    }

    /// Return true with probability `p`
    pub fn chance(&mut self, p: Float) -> bool {
        self.random() < p
    }

    /// Pick an index with probability proportional to its weight
    ///
    /// Weights must be non-negative with a positive sum.
    pub fn pick_weighted(&mut self, weights: &[Float]) -> usize {
        let sum: Float = weights.iter().sum();
        let mut target = self.random() * sum;
        for (idx, &weight) in weights.iter().enumerate() {
            if target < weight {
                return idx;
            }
            target -= weight;
        }
        // Round-off may let us fall through: pick the last nonzero weight
        weights
            .iter()
            .rposition(|&weight| weight > 0.)
            .unwrap_or(0)
    }

    /// Generate an isotropic unit direction as (cos θ, φ)
    pub fn direction(&mut self) -> (Float, Float) {
        let cos_theta = self.uniform(-1., 1.);
        let phi = self.uniform(0., 2. * PI);
        (cos_theta, phi)
    }

    /// Advance state in an arbitrary but maximally fast way
    ///
    /// Used to hand out non-overlapping streams to batches of events.
    pub fn jump(&mut self) {
        self.rng.jump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RandomGenerator::new(42);
        let mut b = RandomGenerator::new(42);
        for _ in 0..100 {
            assert_eq!(a.random(), b.random());
        }
    }

    #[test]
    fn jump_changes_stream() {
        let mut a = RandomGenerator::new(42);
        let mut b = a.clone();
        b.jump();
        assert_ne!(a.random(), b.random());
    }

    #[test]
    fn weighted_pick_skips_zero_weights() {
        let mut rng = RandomGenerator::new(7);
        for _ in 0..1000 {
            let idx = rng.pick_weighted(&[0., 1., 0., 2.]);
            assert!(idx == 1 || idx == 3);
        }
    }

    #[test]
    fn uniform_range() {
        let mut rng = RandomGenerator::new(3);
        for _ in 0..1000 {
            let x = rng.uniform(-2., 5.);
            assert!((-2. ..5.).contains(&x));
            let n = rng.int_in(1, 4);
            assert!((1..=4).contains(&n));
        }
    }
}
