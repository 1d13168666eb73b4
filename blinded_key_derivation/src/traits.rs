//! The randomness capability used for scalar generation.

use rand_core::CryptoRngCore;

/// A source of cryptographically secure random bytes.
///
/// Scalar and blind generation take one of these as an argument instead of
/// reaching for a process-wide generator. Every
/// [CryptoRngCore](rand_core::CryptoRngCore) is a `RandomSource`, so
/// production code passes [OsRng](rand_core::OsRng) and tests pass a seeded
/// generator to get reproducible vectors.
pub trait RandomSource {
    /// Fills `buf` entirely with random bytes.
    fn fill_random(&mut self, buf: &mut [u8]);
}

impl<R: CryptoRngCore + ?Sized> RandomSource for R {
    #[inline]
    fn fill_random(&mut self, buf: &mut [u8]) {
        self.fill_bytes(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::RandomSource;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn seeded_sources_are_reproducible() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        StdRng::from_seed([15u8; 32]).fill_random(&mut a);
        StdRng::from_seed([15u8; 32]).fill_random(&mut b);
        assert_eq!(a, b);
        assert_ne!(a, [0u8; 32]);
    }
}
