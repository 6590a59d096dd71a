//! Pluggable randomness
//!
//! Injected failures and simulated variance draw from a [`ChaosPolicy`] instead of
//! ambient thread randomness, so a test can pin the seed or turn injection off.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct ChaosPolicy {
    rate: f64,
    rng: Mutex<StdRng>,
}

impl ChaosPolicy {
    /// Never trips.
    pub fn disabled() -> Self {
        Self::seeded(0.0, 0)
    }

    pub fn seeded(rate: f64, seed: u64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Seeded when a seed is given, entropy-backed otherwise.
    pub fn new(rate: f64, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(rate, seed),
            None => Self::from_entropy(rate),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn is_enabled(&self) -> bool {
        self.rate > 0.0
    }

    /// Draw once; true with probability `rate`.
    pub fn trip(&self) -> bool {
        if self.rate <= 0.0 {
            return false;
        }
        if self.rate >= 1.0 {
            return true;
        }
        self.rng.lock().random::<f64>() < self.rate
    }

    /// Uniform draw in `[low, high]`.
    pub fn uniform(&self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.lock().random_range(low..=high)
    }
}

impl std::fmt::Debug for ChaosPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaosPolicy").field("rate", &self.rate).finish()
    }
}
