//! Configuration for key derivation and cipher selection.
//!
//! [`Options`] is an immutable value built with `with_*` methods. It is only
//! ever read by the engine; changing configuration means building a new value
//! and handing it to [`crate::AesEngine::update_options`].

use crate::crypto::IV_LEN;
use crate::error::{CipherError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Prefix of the combined PBKDF2 algorithm identifier.
pub const KDF_PREFIX: &str = "PBKDF2WithHmacSHA";
/// Default PBKDF2 work factor.
pub const DEFAULT_ITERATIONS: u32 = 65_536;

/// AES mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Cbc,
    Gcm,
}

impl Algorithm {
    /// Cipher transformation name, in `cipher/mode/padding` notation.
    pub fn transformation(self) -> &'static str {
        match self {
            Algorithm::Cbc => "AES/CBC/PKCS5Padding",
            Algorithm::Gcm => "AES/GCM/NoPadding",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Cbc => f.write_str("cbc"),
            Algorithm::Gcm => f.write_str("gcm"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cbc" => Ok(Algorithm::Cbc),
            "gcm" => Ok(Algorithm::Gcm),
            other => Err(CipherError::Config(format!(
                "unsupported algorithm '{other}' (expected cbc or gcm)"
            ))),
        }
    }
}

/// AES key length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySize {
    Aes128,
    Aes192,
    Aes256,
}

impl KeySize {
    pub fn bits(self) -> u32 {
        match self {
            KeySize::Aes128 => 128,
            KeySize::Aes192 => 192,
            KeySize::Aes256 => 256,
        }
    }

    /// Length of the raw key in bytes.
    pub fn bytes(self) -> usize {
        match self {
            KeySize::Aes128 => 16,
            KeySize::Aes192 => 24,
            KeySize::Aes256 => 32,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            128 => Some(KeySize::Aes128),
            192 => Some(KeySize::Aes192),
            256 => Some(KeySize::Aes256),
            _ => None,
        }
    }
}

impl fmt::Display for KeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl FromStr for KeySize {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<u32>()
            .ok()
            .and_then(KeySize::from_bits)
            .ok_or_else(|| {
                CipherError::Config(format!(
                    "unsupported key size '{s}' (expected 128, 192 or 256)"
                ))
            })
    }
}

/// Width of the SHA-2 hash used as the PBKDF2 PRF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashSize {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashSize {
    pub fn bits(self) -> u32 {
        match self {
            HashSize::Sha224 => 224,
            HashSize::Sha256 => 256,
            HashSize::Sha384 => 384,
            HashSize::Sha512 => 512,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            224 => Some(HashSize::Sha224),
            256 => Some(HashSize::Sha256),
            384 => Some(HashSize::Sha384),
            512 => Some(HashSize::Sha512),
            _ => None,
        }
    }

    /// Combined identifier, e.g. `PBKDF2WithHmacSHA256`.
    pub fn kdf_algorithm(self) -> String {
        format!("{KDF_PREFIX}{}", self.bits())
    }

    /// Inverse of [`HashSize::kdf_algorithm`].
    pub fn from_kdf_algorithm(id: &str) -> Option<Self> {
        id.strip_prefix(KDF_PREFIX)
            .and_then(|bits| bits.parse::<u32>().ok())
            .and_then(HashSize::from_bits)
    }
}

impl fmt::Display for HashSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl FromStr for HashSize {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("sha")
            .or_else(|| s.strip_prefix("SHA"))
            .unwrap_or(s);
        digits
            .parse::<u32>()
            .ok()
            .and_then(HashSize::from_bits)
            .ok_or_else(|| {
                CipherError::Config(format!(
                    "unsupported hash size '{s}' (expected 224, 256, 384 or 512)"
                ))
            })
    }
}

/// Everything needed to derive or accept AES key material.
///
/// Two mutually exclusive paths exist:
/// - derive: `auto_generate` is set, key comes from PBKDF2 over password and salt.
///   An IV may be supplied, otherwise a fresh one is drawn.
/// - supplied: raw key and IV are given directly and no KDF runs.
#[derive(Clone)]
pub struct Options {
    algorithm: Algorithm,
    key_size: KeySize,
    hash_size: HashSize,
    password: Zeroizing<String>,
    salt: Zeroizing<String>,
    iterations: u32,
    auto_generate: bool,
    iv: Option<Vec<u8>>,
    key: Option<Zeroizing<Vec<u8>>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Gcm,
            key_size: KeySize::Aes256,
            hash_size: HashSize::Sha256,
            password: Zeroizing::new(String::new()),
            salt: Zeroizing::new(String::new()),
            iterations: DEFAULT_ITERATIONS,
            auto_generate: true,
            iv: None,
            key: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("algorithm", &self.algorithm)
            .field("key_size", &self.key_size)
            .field("hash_size", &self.hash_size)
            .field("iterations", &self.iterations)
            .field("auto_generate", &self.auto_generate)
            .field("has_password", &!self.password.is_empty())
            .field("has_salt", &!self.salt.is_empty())
            .field("has_iv", &self.iv.is_some())
            .field("has_key", &self.key.is_some())
            .finish()
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_key_size(mut self, key_size: KeySize) -> Self {
        self.key_size = key_size;
        self
    }

    pub fn with_hash_size(mut self, hash_size: HashSize) -> Self {
        self.hash_size = hash_size;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Selects the derive path. The salt is left empty, so the password
    /// doubles as the salt at derivation time.
    pub fn with_password(self, password: &str) -> Self {
        self.with_password_and_salt(password, "")
    }

    /// Selects the derive path with an explicit salt. An empty salt means
    /// the password is used as salt.
    pub fn with_password_and_salt(mut self, password: &str, salt: &str) -> Self {
        self.password = Zeroizing::new(password.to_owned());
        self.salt = Zeroizing::new(salt.to_owned());
        self.auto_generate = true;
        self.key = None;
        self
    }

    /// IV to reuse on the derive path instead of drawing a fresh one.
    pub fn with_iv(mut self, iv: &[u8]) -> Self {
        self.iv = Some(iv.to_vec());
        self
    }

    /// Selects the supplied path: `key` and `iv` are used as-is.
    pub fn with_raw_key(mut self, key: &[u8], iv: &[u8]) -> Self {
        self.key = Some(Zeroizing::new(key.to_vec()));
        self.iv = Some(iv.to_vec());
        self.auto_generate = false;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn key_size(&self) -> KeySize {
        self.key_size
    }

    pub fn hash_size(&self) -> HashSize {
        self.hash_size
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn auto_generate(&self) -> bool {
        self.auto_generate
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Salt as configured; may be empty.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Salt the KDF will actually consume.
    pub fn effective_salt(&self) -> &str {
        if self.salt.is_empty() {
            &self.password
        } else {
            &self.salt
        }
    }

    pub fn iv(&self) -> Option<&[u8]> {
        self.iv.as_deref()
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_ref().map(|k| k.as_slice())
    }

    pub fn kdf_algorithm(&self) -> String {
        self.hash_size.kdf_algorithm()
    }

    /// Checks that the active path has everything it needs.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Config`] naming the first inconsistency found.
    pub fn verify(&self) -> Result<()> {
        if let Some(iv) = &self.iv {
            if iv.len() != IV_LEN {
                return Err(CipherError::Config(format!(
                    "IV must be {IV_LEN} bytes, got {}",
                    iv.len()
                )));
            }
        }

        if self.auto_generate {
            if self.password.is_empty() {
                return Err(CipherError::Config("password is required".into()));
            }
            if self.iterations < 1 {
                return Err(CipherError::Config("iteration count must be >= 1".into()));
            }
            if self.key.is_some() {
                return Err(CipherError::Config(
                    "a raw key cannot be combined with password derivation".into(),
                ));
            }
            return Ok(());
        }

        let key = self
            .key
            .as_ref()
            .ok_or_else(|| CipherError::Config("raw key is required".into()))?;
        if key.len() != self.key_size.bytes() {
            return Err(CipherError::Config(format!(
                "raw key must be {} bytes for AES-{}, got {}",
                self.key_size.bytes(),
                self.key_size,
                key.len()
            )));
        }
        if self.iv.is_none() {
            return Err(CipherError::Config("IV is required with a raw key".into()));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }
}
