//! Cryptographic building blocks.
//!
//! Provides PBKDF2 key derivation, key material resolution, and stateless
//! AES-CBC / AES-GCM encryption over resolved key material.

pub mod cipher;
pub mod kdf;
pub mod material;
pub mod random;

pub use cipher::{decrypt, encrypt};
pub use kdf::derive_key;
pub use material::KeyMaterial;
pub use random::{EntropySource, OsEntropy};

/// Length of the IV (16 bytes). GCM uses the same bytes as its nonce.
pub const IV_LEN: usize = 16;
/// Length of the GCM authentication tag (16 bytes / 128 bits).
pub const GCM_TAG_LEN: usize = 16;
