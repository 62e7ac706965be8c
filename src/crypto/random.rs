use crate::error::{CipherError, Result};
use getrandom::fill;

/// Source of random bytes for IVs and generated passwords.
pub trait EntropySource {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Uniform value in `0..bound` by rejection sampling. `bound` must be non-zero.
    fn below(&mut self, bound: u32) -> Result<u32> {
        debug_assert!(bound > 0);
        // largest multiple of `bound` that fits in u32
        let zone = u32::MAX - (u32::MAX % bound);
        loop {
            let mut buf = [0u8; 4];
            self.fill(&mut buf)?;
            let v = u32::from_le_bytes(buf);
            if v < zone {
                return Ok(v % bound);
            }
        }
    }
}

/// Operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        fill(buf).map_err(|_| CipherError::Entropy)
    }
}

impl<E: EntropySource + ?Sized> EntropySource for &mut E {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).fill(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sequence(Vec<u32>);

    impl EntropySource for Sequence {
        fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
            let next = self.0.remove(0);
            buf.copy_from_slice(&next.to_le_bytes());
            Ok(())
        }
    }

    #[test]
    fn os_entropy_fills_buffer() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        OsEntropy.fill(&mut a).unwrap();
        OsEntropy.fill(&mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn below_rejects_values_in_biased_zone() {
        // bound 3: zone = u32::MAX - 0 = u32::MAX, so u32::MAX itself is rejected
        let mut src = Sequence(vec![u32::MAX, 7]);
        assert_eq!(src.below(3).unwrap(), 1);
        assert!(src.0.is_empty());
    }

    #[test]
    fn below_stays_in_range() {
        let mut src = OsEntropy;
        for _ in 0..1000 {
            assert!(src.below(5).unwrap() < 5);
        }
    }
}
