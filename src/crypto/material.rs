//! Key material held by an engine: the raw AES key, its IV, and the
//! metadata needed to write it back out as a key file.

use super::IV_LEN;
use super::kdf::{KdfParams, derive_key};
use super::random::EntropySource;
use crate::error::{CipherError, Result};
use crate::options::{HashSize, KeySize, Options};
use std::fmt;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Raw AES key plus IV. The key is wiped when the value is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    key_size: KeySize,
    hash: HashSize,
    key: Zeroizing<Vec<u8>>,
    iv: [u8; IV_LEN],
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key_size", &self.key_size)
            .field("hash", &self.hash)
            .field("key", &"<redacted>")
            .field("iv", &self.iv)
            .finish()
    }
}

impl KeyMaterial {
    /// Builds key material from raw parts, checking both lengths.
    pub fn new(key_size: KeySize, hash: HashSize, key: &[u8], iv: &[u8]) -> Result<Self> {
        if key.len() != key_size.bytes() {
            return Err(CipherError::InvalidKeyMaterial(format!(
                "expected {} key bytes for AES-{key_size}, got {}",
                key_size.bytes(),
                key.len()
            )));
        }
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| {
            CipherError::InvalidKeyMaterial(format!(
                "expected {IV_LEN} IV bytes, got {}",
                iv.len()
            ))
        })?;

        Ok(Self {
            key_size,
            hash,
            key: Zeroizing::new(key.to_vec()),
            iv,
        })
    }

    /// Resolves options into key material.
    ///
    /// - derive path with a supplied IV: only the key is derived
    /// - derive path without IV: key is derived, IV drawn from `entropy`
    /// - supplied path: key and IV are copied, no KDF runs
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Config`] if the options do not verify, and
    /// propagates KDF and entropy failures.
    pub fn resolve(options: &Options, entropy: &mut dyn EntropySource) -> Result<Self> {
        if let Err(e) = options.verify() {
            warn!(error = %e, "rejected options");
            return Err(e);
        }

        let key_size = options.key_size();
        let hash = options.hash_size();

        if !options.auto_generate() {
            debug!(key_bits = key_size.bits(), "using supplied key material");
            let key = options
                .key()
                .ok_or_else(|| CipherError::Config("raw key is required".into()))?;
            let iv = options
                .iv()
                .ok_or_else(|| CipherError::Config("IV is required with a raw key".into()))?;
            return Self::new(key_size, hash, key, iv);
        }

        let kdf = KdfParams::new(hash, key_size, options.iterations())?;
        let key = derive_key(options.password(), options.salt(), kdf)?;

        let iv = match options.iv() {
            Some(iv) => {
                debug!("reusing supplied IV");
                iv.to_vec()
            }
            None => {
                let mut iv = vec![0u8; IV_LEN];
                entropy.fill(&mut iv)?;
                debug!("generated fresh IV");
                iv
            }
        };

        Self::new(key_size, hash, &key, &iv)
    }

    pub fn key_size(&self) -> KeySize {
        self.key_size
    }

    pub fn hash(&self) -> HashSize {
        self.hash
    }

    /// Combined derivation identifier, e.g. `PBKDF2WithHmacSHA256`.
    pub fn kdf_algorithm(&self) -> String {
        self.hash.kdf_algorithm()
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}
