//! Key file format handling.
//!
//! Two layouts are understood:
//! - [`KeyFileFormat::Delimited`]: the interoperable layout, fields split by
//!   ASCII record/group separator bytes. Written by default.
//! - [`KeyFileFormat::LengthPrefixed`]: magic + version, every variable field
//!   carries an explicit length.
//!
//! [`parse`] detects the layout from the leading bytes.

use crate::crypto::KeyMaterial;
use crate::error::{CipherError, Result};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub mod delimited;
pub mod prefixed;

/// ASCII record separator, ends the derivation identifier.
pub const RECORD_SEPARATOR: u8 = 0x1E;
/// ASCII group separator, sits between key and IV.
pub const GROUP_SEPARATOR: u8 = 0x1D;
/// Length of the big-endian key size field.
pub const KEY_SIZE_LEN: usize = 4;

/// On-disk layout of a key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyFileFormat {
    #[default]
    Delimited,
    LengthPrefixed,
}

impl KeyFileFormat {
    /// Layout of `data`, judged by its leading bytes.
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(prefixed::MAGIC) {
            KeyFileFormat::LengthPrefixed
        } else {
            KeyFileFormat::Delimited
        }
    }
}

impl fmt::Display for KeyFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFileFormat::Delimited => f.write_str("delimited"),
            KeyFileFormat::LengthPrefixed => f.write_str("length-prefixed"),
        }
    }
}

impl FromStr for KeyFileFormat {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "delimited" | "legacy" => Ok(KeyFileFormat::Delimited),
            "length-prefixed" | "prefixed" | "v2" => Ok(KeyFileFormat::LengthPrefixed),
            other => Err(CipherError::Config(format!(
                "unknown key file format '{other}' (expected delimited or length-prefixed)"
            ))),
        }
    }
}

/// Parses key file bytes in either layout.
///
/// # Errors
///
/// Returns [`CipherError::Format`] if the content is truncated, a separator
/// is missing, or the key size / identifier is not supported.
pub fn parse(data: &[u8]) -> Result<KeyMaterial> {
    match KeyFileFormat::detect(data) {
        KeyFileFormat::Delimited => delimited::parse(data),
        KeyFileFormat::LengthPrefixed => prefixed::parse(data),
    }
}

/// Serializes key material in the requested layout.
pub fn serialize(material: &KeyMaterial, format: KeyFileFormat) -> Vec<u8> {
    match format {
        KeyFileFormat::Delimited => delimited::serialize(material),
        KeyFileFormat::LengthPrefixed => prefixed::serialize(material),
    }
}

/// Writes a new key file. Existing files are never overwritten.
///
/// # Errors
///
/// Returns [`CipherError::AlreadyExists`] if `path` exists, or an I/O error.
pub fn write_key_file(path: &Path, material: &KeyMaterial, format: KeyFileFormat) -> Result<()> {
    let data = serialize(material, format);
    Storage::new(path.to_path_buf()).create(&data)?;
    debug!(
        path = %path.display(),
        %format,
        key_bits = material.key_size().bits(),
        algorithm = %material.kdf_algorithm(),
        "wrote key file"
    );
    Ok(())
}

/// Reads a key file written in either layout.
pub fn read_key_file(path: &Path) -> Result<KeyMaterial> {
    let data = Storage::new(path.to_path_buf()).load()?;
    let material = parse(&data)?;
    debug!(
        path = %path.display(),
        format = %KeyFileFormat::detect(&data),
        key_bits = material.key_size().bits(),
        "read key file"
    );
    Ok(material)
}

/// Maps key material validation failures into format errors while parsing.
pub(crate) fn malformed(err: CipherError) -> CipherError {
    match err {
        CipherError::InvalidKeyMaterial(msg) => CipherError::Format(msg),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{HashSize, KeySize};
    use tempfile::tempdir;

    fn material() -> KeyMaterial {
        KeyMaterial::new(KeySize::Aes256, HashSize::Sha512, &[5u8; 32], &[6u8; 16]).unwrap()
    }

    #[test]
    fn detect_and_parse_both_layouts() {
        let km = material();
        for format in [KeyFileFormat::Delimited, KeyFileFormat::LengthPrefixed] {
            let bytes = serialize(&km, format);
            assert_eq!(KeyFileFormat::detect(&bytes), format);
            assert_eq!(parse(&bytes).unwrap(), km);
        }
    }

    #[test]
    fn write_then_read_key_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("k.key");

        write_key_file(&path, &material(), KeyFileFormat::Delimited).unwrap();
        let loaded = read_key_file(&path).unwrap();

        assert_eq!(loaded, material());
        assert_eq!(loaded.kdf_algorithm(), "PBKDF2WithHmacSHA512");
    }

    #[test]
    fn write_refuses_existing_file_and_keeps_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("k.key");
        std::fs::write(&path, b"original").unwrap();

        let err = write_key_file(&path, &material(), KeyFileFormat::Delimited).unwrap_err();

        assert!(matches!(err, CipherError::AlreadyExists(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_key_file(&dir.path().join("missing.key")).unwrap_err();
        assert!(matches!(err, CipherError::Io(_)));
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("legacy".parse::<KeyFileFormat>().unwrap(), KeyFileFormat::Delimited);
        assert_eq!("v2".parse::<KeyFileFormat>().unwrap(), KeyFileFormat::LengthPrefixed);
        assert!("xml".parse::<KeyFileFormat>().is_err());
    }
}
