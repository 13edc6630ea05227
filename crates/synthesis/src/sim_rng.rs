//! Deterministic generation RNG.
//!
//! Wraps `ChaCha8Rng` for cross-platform deterministic randomness. Every
//! piece of randomness in a generation (neighbour selection, speed sampling,
//! start selection) draws from a `SimRng` derived from the caller-supplied
//! seed, so `(seed, trajectory index)` uniquely determines the output
//! regardless of worker scheduling.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Default seed used when no explicit seed is provided.
const DEFAULT_SEED: u64 = 42;

/// Deterministic RNG for all generation randomness.
///
/// Consumers use `rng.0` (a `ChaCha8Rng` implementing `rand::Rng`).
pub struct SimRng(pub ChaCha8Rng);

impl Default for SimRng {
    fn default() -> Self {
        Self(ChaCha8Rng::seed_from_u64(DEFAULT_SEED))
    }
}

impl SimRng {
    /// Create a new `SimRng` seeded from the given `u64` value.
    pub fn from_seed_u64(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Independent per-trajectory RNG: the run seed selects the key, the
    /// trajectory index selects the ChaCha stream. Streams never overlap,
    /// so workers can draw concurrently without coordination.
    pub fn for_trajectory(seed: u64, index: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(index);
        Self(rng)
    }
}
