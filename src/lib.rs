//! Password-based AES encryption with portable key files.
//!
//! An [`AesEngine`] is built from [`Options`]: it derives (PBKDF2) or accepts
//! raw key material, fixes the AES mode (CBC or GCM), and then encrypts and
//! decrypts byte slices and strings. Key material can be exported to a key
//! file and reloaded later without the password.
//!
//! ```no_run
//! use nsp_aes::{AesEngine, Algorithm, Options};
//!
//! let engine = AesEngine::new(
//!     Options::new()
//!         .with_algorithm(Algorithm::Gcm)
//!         .with_password_and_salt("correct horse", "battery staple"),
//! )?;
//! let ct = engine.encrypt_str("hello")?;
//! assert_eq!(engine.decrypt_to_string(&ct)?, "hello");
//! # Ok::<(), nsp_aes::CipherError>(())
//! ```

pub mod crypto;
mod error;
pub mod format;
pub mod options;
pub mod password;
mod storage;

pub use crate::crypto::{EntropySource, KeyMaterial, OsEntropy};
pub use crate::error::{CipherError, Result};
pub use crate::format::{KeyFileFormat, read_key_file, write_key_file};
pub use crate::options::{Algorithm, HashSize, KeySize, Options};
pub use crate::password::{DEFAULT_CHARSET, generate_default_password, generate_password};
pub use crate::storage::Storage;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

/// Holds validated options and the key material resolved from them.
///
/// Encryption and decryption borrow the engine immutably and build a fresh
/// cipher context per call, so one engine can serve several threads.
/// [`AesEngine::update_options`] needs `&mut self`.
#[derive(Debug)]
pub struct AesEngine {
    options: Options,
    material: KeyMaterial,
}

impl AesEngine {
    /// Builds an engine, drawing any missing IV from the OS RNG.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Config`] if the options do not verify, or a
    /// key derivation / entropy error.
    pub fn new(options: Options) -> Result<Self> {
        Self::with_entropy(options, &mut OsEntropy)
    }

    /// Builds an engine with an explicit entropy source for IV generation.
    pub fn with_entropy(options: Options, entropy: &mut dyn EntropySource) -> Result<Self> {
        let material = KeyMaterial::resolve(&options, entropy)?;
        debug!(
            transformation = options.algorithm().transformation(),
            key_bits = material.key_size().bits(),
            "engine ready"
        );
        Ok(Self { options, material })
    }

    /// Rebuilds an engine from a key file, without any password.
    pub fn from_key_file(path: &Path, algorithm: Algorithm) -> Result<Self> {
        let material = read_key_file(path)?;
        let options = Options::new()
            .with_algorithm(algorithm)
            .with_key_size(material.key_size())
            .with_hash_size(material.hash())
            .with_raw_key(material.key(), material.iv());
        debug!(
            path = %path.display(),
            transformation = algorithm.transformation(),
            "engine loaded from key file"
        );
        Ok(Self { options, material })
    }

    /// Re-resolves key material from new options.
    ///
    /// On error the engine keeps its previous options and key material.
    pub fn update_options(&mut self, options: Options) -> Result<()> {
        self.update_options_with(options, &mut OsEntropy)
    }

    pub fn update_options_with(
        &mut self,
        options: Options,
        entropy: &mut dyn EntropySource,
    ) -> Result<()> {
        let material = KeyMaterial::resolve(&options, entropy)?;
        debug!(
            transformation = options.algorithm().transformation(),
            "options updated"
        );
        self.options = options;
        self.material = material;
        Ok(())
    }

    /// Switches to password derivation with `password` doubling as salt.
    pub fn set_password(&mut self, password: &str) -> Result<()> {
        self.set_password_and_salt(password, "")
    }

    /// Switches to password derivation with an explicit salt.
    /// An empty salt means the password is used as salt.
    pub fn set_password_and_salt(&mut self, password: &str, salt: &str) -> Result<()> {
        let options = self.options.clone().with_password_and_salt(password, salt);
        self.update_options(options)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        crypto::encrypt(self.options.algorithm(), &self.material, plaintext)
    }

    /// Encrypts the UTF-8 bytes of `plaintext`.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>> {
        self.encrypt(plaintext.as_bytes())
    }

    /// # Errors
    ///
    /// [`CipherError::Authentication`] if a GCM tag does not verify,
    /// [`CipherError::Decryption`] on CBC padding failure.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        crypto::decrypt(self.options.algorithm(), &self.material, ciphertext)
    }

    /// Decrypts and decodes the plaintext as UTF-8.
    pub fn decrypt_to_string(&self, ciphertext: &[u8]) -> Result<String> {
        let plaintext = self.decrypt(ciphertext)?;
        std::str::from_utf8(&plaintext)
            .map(str::to_owned)
            .map_err(|e| CipherError::Encoding(e.valid_up_to()))
    }

    /// Writes the key material as a delimited key file.
    pub fn write_key_file(&self, path: &Path) -> Result<()> {
        self.write_key_file_as(path, KeyFileFormat::Delimited)
    }

    pub fn write_key_file_as(&self, path: &Path, format: KeyFileFormat) -> Result<()> {
        write_key_file(path, &self.material, format)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn algorithm(&self) -> Algorithm {
        self.options.algorithm()
    }

    /// e.g. `AES/GCM/NoPadding`
    pub fn transformation(&self) -> &'static str {
        self.options.algorithm().transformation()
    }

    pub fn key_material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn key(&self) -> &[u8] {
        self.material.key()
    }

    pub fn iv(&self) -> &[u8; crypto::IV_LEN] {
        self.material.iv()
    }

    pub fn kdf_algorithm(&self) -> String {
        self.material.kdf_algorithm()
    }
}

/// Per-user location of the key file used when none is given.
pub fn default_key_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "nsp-aes").ok_or_else(|| {
        CipherError::Config("could not determine platform directories".into())
    })?;

    Ok(project_dirs.data_dir().join("default.key"))
}
