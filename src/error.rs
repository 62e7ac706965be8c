//! Error type shared by every operation in the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while configuring, deriving, encrypting or persisting keys.
///
/// None of the variants carry key bytes, passwords or plaintext.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Options failed validation or an unknown algorithm tag was requested.
    #[error("invalid options: {0}")]
    Config(String),

    /// PBKDF2 rejected its parameters.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Key or IV has the wrong length for the selected key size.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The cipher could not be initialized for encryption.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// GCM tag verification failed: ciphertext tampered or wrong key.
    #[error("decryption failed: authentication tag mismatch")]
    Authentication,

    /// CBC decryption failed (bad padding, truncated block).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted data is not valid UTF-8 (invalid byte at offset {0})")]
    Encoding(usize),

    /// Key file target already exists; key files are never overwritten.
    #[error("key file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Key file content is truncated or malformed.
    #[error("invalid key file: {0}")]
    Format(String),

    /// OS random generator unavailable.
    #[error("random generator unavailable")]
    Entropy,

    /// Password generation was asked for an impossible result.
    #[error("password generation error: {0}")]
    PasswordGeneration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CipherError>;
