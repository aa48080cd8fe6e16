//! Deterministic PRNG for breakdown onset and pass/fail draws.
//!
//! Uses the SplitMix64 algorithm: fast, 8 bytes of state, and trivially
//! hashable for determinism checks.

use crate::fixed::Fixed64;

/// SplitMix64 pseudo-random number generator.
///
/// The engine owns exactly one of these; every random decision in a tick is
/// drawn from it in entity creation order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Restart the sequence from `seed`. Called on every compile.
    pub fn reseed(&mut self, seed: u64) {
        self.state = seed;
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Returns `true` when a uniform draw in `[0, 1)` is below `probability`.
    ///
    /// - probability <= 0 always returns false and consumes nothing
    /// - probability >= 1 always returns true and consumes nothing
    pub fn chance(&mut self, probability: Fixed64) -> bool {
        if probability <= Fixed64::ZERO {
            return false;
        }
        if probability >= Fixed64::ONE {
            return true;
        }
        // For p in (0,1) the raw Q32.32 bits are the fraction scaled to
        // [0, 2^32); compare against a uniform u32.
        let upper = (self.next_u64() >> 32) as u32;
        (upper as u64) < probability.to_bits() as u64
    }

    /// Get the internal state (for hashing).
    pub fn state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let mut a = SimRng::new(42);
        let mut b = SimRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn reseed_replays_sequence() {
        let mut rng = SimRng::new(7);
        let first: Vec<u64> = (0..5).map(|_| rng.next_u64()).collect();
        rng.reseed(7);
        let again: Vec<u64> = (0..5).map(|_| rng.next_u64()).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn certain_outcomes_do_not_advance_state() {
        let mut rng = SimRng::new(999);
        let before = rng.state();
        assert!(!rng.chance(Fixed64::ZERO));
        assert!(rng.chance(Fixed64::ONE));
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn quarter_probability_roughly_holds() {
        let mut rng = SimRng::new(12345);
        let quarter = Fixed64::from_num(0.25);
        let hits = (0..10_000).filter(|_| rng.chance(quarter)).count();
        assert!((2000..=3000).contains(&hits), "expected ~2500, got {hits}");
    }
}
