use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::util::HE_PRNG_SEED_BYTES;

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PRNGSeed(pub [u8; HE_PRNG_SEED_BYTES]);

impl Default for PRNGSeed {
    fn default() -> Self {
        PRNGSeed([0; HE_PRNG_SEED_BYTES])
    }
}

impl AsMut<[u8]> for PRNGSeed {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl AsRef<[u8]> for PRNGSeed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for PRNGSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PRNGSeed(..)")
    }
}

impl From<u64> for PRNGSeed {
    /// Expands a short seed, for reproducible runs from the command line.
    fn from(value: u64) -> Self {
        let mut seed = PRNGSeed::default();
        ChaCha20Rng::seed_from_u64(value).fill_bytes(&mut seed.0);
        seed
    }
}

/// Hands out [BlakeRNG]s, either freshly seeded from the OS or all from one fixed seed.
#[derive(Clone, Debug, Default)]
pub struct BlakeRNGFactory {
    seed: Option<PRNGSeed>,
}

impl BlakeRNGFactory {

    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn from_seed(seed: PRNGSeed) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn is_deterministic(&self) -> bool {
        self.seed.is_some()
    }

    pub fn get_rng(&self) -> BlakeRNG {
        match self.seed {
            Some(seed) => BlakeRNG::from_seed(seed),
            None => {
                let mut seed = PRNGSeed::default();
                ChaCha20Rng::from_entropy().fill_bytes(&mut seed.0);
                BlakeRNG::from_seed(seed)
            }
        }
    }

}

const BUFFER_SIZE: usize = 4096;

/// Counter-mode generator over the BLAKE3 extendable output function.
pub struct BlakeRNG {
    buffer: Box<[u8; BUFFER_SIZE]>,
    seed: PRNGSeed,
    counter: u64,
    buffer_current: usize,
}

impl SeedableRng for BlakeRNG {
    type Seed = PRNGSeed;

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            seed,
            counter: 0,
            buffer: Box::new([0; BUFFER_SIZE]),
            buffer_current: BUFFER_SIZE,
        }
    }
}

impl BlakeRNG {

    fn refill_buffer(&mut self) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.seed.as_ref());
        hasher.update(&self.counter.to_le_bytes());
        hasher.finalize_xof().fill(&mut self.buffer[..]);
        self.buffer_current = 0;
        self.counter = self.counter.wrapping_add(1);
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        if self.buffer_current + N > BUFFER_SIZE {
            self.refill_buffer();
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.buffer_current..self.buffer_current + N]);
        self.buffer_current += N;
        out
    }

}

impl RngCore for BlakeRNG {

    fn next_u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take::<4>())
    }

    fn next_u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take::<8>())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut i = 0;
        while i < dest.len() {
            if self.buffer_current >= BUFFER_SIZE {
                self.refill_buffer();
            }
            let len = (dest.len() - i).min(BUFFER_SIZE - self.buffer_current);
            dest[i..i + len].copy_from_slice(&self.buffer[self.buffer_current..self.buffer_current + len]);
            i += len;
            self.buffer_current += len;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }

}

impl CryptoRng for BlakeRNG {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake_rng() {
        let mut rng = BlakeRNG::from_seed(PRNGSeed([1; 64]));
        let mut rng2 = BlakeRNG::from_seed(PRNGSeed([1; 64]));
        for _ in 0..1000 {
            assert_eq!(rng.next_u32(), rng2.next_u32());
            assert_eq!(rng.next_u64(), rng2.next_u64());
        }
        let mut other = BlakeRNG::from_seed(PRNGSeed([2; 64]));
        assert_ne!(rng.next_u64(), other.next_u64());
    }

    #[test]
    fn test_blake_rng_factory() {
        let factory = BlakeRNGFactory::from_seed(PRNGSeed::from(7));
        assert!(factory.is_deterministic());
        let mut rng = factory.get_rng();
        let mut rng2 = factory.get_rng();
        let mut a = [0u8; 5000];
        let mut b = [0u8; 5000];
        rng.fill_bytes(&mut a);
        rng2.fill_bytes(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_blake_rng_factory_randomized() {
        let factory = BlakeRNGFactory::new();
        assert!(!factory.is_deterministic());
        let mut rng = factory.get_rng();
        let mut rng2 = factory.get_rng();
        assert_ne!(rng.next_u64(), rng2.next_u64());
    }

}
