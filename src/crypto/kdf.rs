use crate::error::{CipherError, Result};
use crate::options::{HashSize, KeySize};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use tracing::debug;
use zeroize::Zeroizing;

/// PBKDF2 input parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    hash: HashSize,
    key_size: KeySize,
    iterations: u32,
}

impl KdfParams {
    pub fn new(hash: HashSize, key_size: KeySize, iterations: u32) -> Result<Self> {
        let params = Self {
            hash,
            key_size,
            iterations,
        };
        params.validate()?;
        Ok(params)
    }

    /// Combined identifier, e.g. `PBKDF2WithHmacSHA512`.
    pub fn algorithm(&self) -> String {
        self.hash.kdf_algorithm()
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations < 1 {
            return Err(CipherError::KeyDerivation("PBKDF2 iteration count must be >= 1".into()));
        }
        Ok(())
    }
}

/// Derives `key_size / 8` bytes with PBKDF2-HMAC-SHA2.
///
/// An empty `salt` makes the password double as the salt.
pub fn derive_key(password: &str, salt: &str, kdf: KdfParams) -> Result<Zeroizing<Vec<u8>>> {
    kdf.validate()?;
    if password.is_empty() {
        return Err(CipherError::KeyDerivation("password must not be empty".into()));
    }

    let salt = if salt.is_empty() { password } else { salt };
    let mut key = Zeroizing::new(vec![0u8; kdf.key_size.bytes()]);

    let (pw, salt, rounds) = (password.as_bytes(), salt.as_bytes(), kdf.iterations);
    match kdf.hash {
        HashSize::Sha224 => pbkdf2_hmac::<Sha224>(pw, salt, rounds, &mut key),
        HashSize::Sha256 => pbkdf2_hmac::<Sha256>(pw, salt, rounds, &mut key),
        HashSize::Sha384 => pbkdf2_hmac::<Sha384>(pw, salt, rounds, &mut key),
        HashSize::Sha512 => pbkdf2_hmac::<Sha512>(pw, salt, rounds, &mut key),
    }

    debug!(
        algorithm = %kdf.algorithm(),
        key_bits = kdf.key_size.bits(),
        iterations = kdf.iterations,
        "derived key"
    );
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(hash: HashSize, key_size: KeySize) -> KdfParams {
        KdfParams::new(hash, key_size, 1000).unwrap()
    }

    #[test]
    fn kdf_is_deterministic() {
        let kdf = params(HashSize::Sha256, KeySize::Aes256);
        let k1 = derive_key("password", "salt", kdf).unwrap();
        let k2 = derive_key("password", "salt", kdf).unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn output_length_follows_key_size() {
        for size in [KeySize::Aes128, KeySize::Aes192, KeySize::Aes256] {
            let key = derive_key("pw", "salt", params(HashSize::Sha512, size)).unwrap();
            assert_eq!(key.len(), size.bytes());
        }
    }

    #[test]
    fn hash_choice_affects_output() {
        let a = derive_key("pw", "salt", params(HashSize::Sha256, KeySize::Aes256)).unwrap();
        let b = derive_key("pw", "salt", params(HashSize::Sha384, KeySize::Aes256)).unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn empty_salt_equals_password_as_salt() {
        let kdf = params(HashSize::Sha256, KeySize::Aes128);
        let a = derive_key("p1", "", kdf).unwrap();
        let b = derive_key("p1", "p1", kdf).unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn rfc7914_pbkdf2_sha256_vector() {
        // RFC 7914 section 11: P="passwd", S="salt", c=1, dkLen=64 (first 32 bytes)
        let kdf = KdfParams::new(HashSize::Sha256, KeySize::Aes256, 1).unwrap();
        let key = derive_key("passwd", "salt", kdf).unwrap();
        assert_eq!(
            key.as_slice(),
            &[
                0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f, 0xec, 0x16, 0x91, 0xc2, 0x25,
                0x44, 0xb6, 0x05, 0xf9, 0x41, 0x85, 0x21, 0x6d, 0xde, 0x04, 0x65, 0xe6, 0x8b,
                0x9d, 0x57, 0xc2, 0x0d, 0xac, 0xbc,
            ]
        );
    }

    #[test]
    fn invalid_params_fail_gracefully() {
        assert!(matches!(
            KdfParams::new(HashSize::Sha256, KeySize::Aes256, 0),
            Err(CipherError::KeyDerivation(_))
        ));
    }

    #[test]
    fn empty_password_fails() {
        let kdf = params(HashSize::Sha256, KeySize::Aes256);
        assert!(matches!(
            derive_key("", "salt", kdf),
            Err(CipherError::KeyDerivation(_))
        ));
    }
}
