//! Nonce randomness.

use rand::{RngCore, SeedableRng};
use std::sync::Mutex;

/// A source of 64-bit randomness for probe nonces.
///
/// Callers are responsible for setting or clearing bit 63 (the
/// coordinator-proxy flag) after drawing a value; `Rng` only supplies the
/// remaining 63 bits of entropy.
pub trait Rng: Send + Sync {
    fn next_u64(&self) -> u64;
}

/// The real `Rng`, backed by `ChaCha8Rng` seeded from the OS CSPRNG.
///
/// `ChaCha8Rng` (not `rand::thread_rng()`) so a seed can be pinned in tests
/// that want a real PRNG's statistical shape but reproducible output.
pub struct ChaChaRng {
    inner: Mutex<rand_chacha::ChaCha8Rng>,
}

impl ChaChaRng {
    /// Seeds from the OS CSPRNG.
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        getrandom::fill(&mut seed).expect("OS randomness source unavailable");
        Self::from_seed(seed)
    }

    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            inner: Mutex::new(rand_chacha::ChaCha8Rng::from_seed(seed)),
        }
    }
}

impl Default for ChaChaRng {
    fn default() -> Self {
        Self::new()
    }
}

impl Rng for ChaChaRng {
    fn next_u64(&self) -> u64 {
        self.inner.lock().expect("rng mutex poisoned").next_u64()
    }
}

/// A deterministic `Rng` for tests: replays a fixed sequence, then repeats
/// its last value.
pub struct FakeRng {
    values: Mutex<(Vec<u64>, usize)>,
}

impl FakeRng {
    #[must_use]
    pub fn sequence(values: Vec<u64>) -> Self {
        assert!(!values.is_empty(), "FakeRng needs at least one value");
        Self {
            values: Mutex::new((values, 0)),
        }
    }

    #[must_use]
    pub fn constant(value: u64) -> Self {
        Self::sequence(vec![value])
    }
}

impl Rng for FakeRng {
    fn next_u64(&self) -> u64 {
        let mut guard = self.values.lock().expect("rng mutex poisoned");
        let (values, index) = &mut *guard;
        let value = values[(*index).min(values.len() - 1)];
        if *index + 1 < values.len() {
            *index += 1;
        }
        value
    }
}
