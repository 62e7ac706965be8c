//! Delimited key file layout.
//!
//! ```text
//! KEY_BITS (4, u32 BE) | KDF_ID (utf-8) | 0x1E | KEY (KEY_BITS / 8) | 0x1D | IV (16)
//! ```
//!
//! Only the identifier is delimiter-terminated; key and IV are read by
//! length, so separator values inside key bytes do not confuse the parser.

use super::{GROUP_SEPARATOR, KEY_SIZE_LEN, RECORD_SEPARATOR, malformed};
use crate::crypto::KeyMaterial;
use crate::error::{CipherError, Result};
use crate::options::{HashSize, KeySize};

/// Serializes key material into the delimited layout.
pub fn serialize(material: &KeyMaterial) -> Vec<u8> {
    let id = material.kdf_algorithm();
    let mut buf = Vec::with_capacity(
        KEY_SIZE_LEN + id.len() + 2 + material.key().len() + material.iv().len(),
    );

    buf.extend_from_slice(&material.key_size().bits().to_be_bytes());
    buf.extend_from_slice(id.as_bytes());
    buf.push(RECORD_SEPARATOR);
    buf.extend_from_slice(material.key());
    buf.push(GROUP_SEPARATOR);
    buf.extend_from_slice(material.iv());

    buf
}

/// Parses the delimited layout.
///
/// # Errors
///
/// Returns [`CipherError::Format`] on truncation, missing separators, or an
/// unsupported key size or identifier.
pub fn parse(data: &[u8]) -> Result<KeyMaterial> {
    if data.len() < KEY_SIZE_LEN {
        return Err(CipherError::Format("file too short".into()));
    }

    let (size_field, rest) = data.split_at(KEY_SIZE_LEN);
    let bits = u32::from_be_bytes(
        size_field
            .try_into()
            .map_err(|_| CipherError::Format("invalid key size field".into()))?,
    );
    let key_size = KeySize::from_bits(bits)
        .ok_or_else(|| CipherError::Format(format!("unsupported key size: {bits}")))?;

    let id_end = rest
        .iter()
        .position(|&b| b == RECORD_SEPARATOR)
        .ok_or_else(|| CipherError::Format("missing record separator".into()))?;
    let id = std::str::from_utf8(&rest[..id_end])
        .map_err(|_| CipherError::Format("derivation identifier is not UTF-8".into()))?;
    let hash = HashSize::from_kdf_algorithm(id)
        .ok_or_else(|| CipherError::Format(format!("unsupported derivation algorithm: {id}")))?;
    let rest = &rest[id_end + 1..];

    let key_len = key_size.bytes();
    if rest.len() < key_len {
        return Err(CipherError::Format(format!(
            "truncated key: expected {key_len} bytes, found {}",
            rest.len()
        )));
    }
    let (key, rest) = rest.split_at(key_len);

    match rest.split_first() {
        Some((&GROUP_SEPARATOR, iv)) => {
            KeyMaterial::new(key_size, hash, key, iv).map_err(malformed)
        }
        _ => Err(CipherError::Format("missing group separator".into())),
    }
}
