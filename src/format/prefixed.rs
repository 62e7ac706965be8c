//! Length-prefixed key file layout.
//!
//! ```text
//! MAGIC "NSPK" (4) | VERSION (1) | KEY_BITS (4) | ID_LEN (2) | KDF_ID | KEY_LEN (2) | KEY | IV_LEN (2) | IV
//! ```
//!
//! All integers are big-endian.

use super::{KEY_SIZE_LEN, malformed};
use crate::crypto::KeyMaterial;
use crate::error::{CipherError, Result};
use crate::options::{HashSize, KeySize};

/// Magic bytes identifying a length-prefixed key file.
pub const MAGIC: &[u8; 4] = b"NSPK";
/// Current length-prefixed format version.
pub const VERSION: u8 = 2;

const VER_LEN: usize = 1;
const LEN_LEN: usize = 2;

/// Serializes key material into the length-prefixed layout.
pub fn serialize(material: &KeyMaterial) -> Vec<u8> {
    let id = material.kdf_algorithm();
    let mut buf = Vec::with_capacity(
        MAGIC.len()
            + VER_LEN
            + KEY_SIZE_LEN
            + 3 * LEN_LEN
            + id.len()
            + material.key().len()
            + material.iv().len(),
    );

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&material.key_size().bits().to_be_bytes());
    for field in [id.as_bytes(), material.key(), material.iv().as_slice()] {
        // every field is far below u16::MAX
        buf.extend_from_slice(&(field.len() as u16).to_be_bytes());
        buf.extend_from_slice(field);
    }

    buf
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| CipherError::Format(format!("truncated {what}")))?;
        let out = &self.data[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    fn field(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.take(LEN_LEN, what)?;
        let len = u16::from_be_bytes([len[0], len[1]]) as usize;
        self.take(len, what)
    }
}

/// Parses the length-prefixed layout.
///
/// # Errors
///
/// Returns [`CipherError::Format`] on bad magic, unsupported version,
/// truncation, trailing bytes, or unsupported key size / identifier.
pub fn parse(data: &[u8]) -> Result<KeyMaterial> {
    let mut r = Reader { data, offset: 0 };

    if r.take(MAGIC.len(), "magic")? != MAGIC {
        return Err(CipherError::Format("invalid magic".into()));
    }

    let version = r.take(VER_LEN, "version")?[0];
    if version != VERSION {
        return Err(CipherError::Format(format!("unsupported key file version: {version}")));
    }

    let bits = r.take(KEY_SIZE_LEN, "key size")?;
    let bits = u32::from_be_bytes([bits[0], bits[1], bits[2], bits[3]]);
    let key_size = KeySize::from_bits(bits)
        .ok_or_else(|| CipherError::Format(format!("unsupported key size: {bits}")))?;

    let id = std::str::from_utf8(r.field("derivation identifier")?)
        .map_err(|_| CipherError::Format("derivation identifier is not UTF-8".into()))?;
    let hash = HashSize::from_kdf_algorithm(id)
        .ok_or_else(|| CipherError::Format(format!("unsupported derivation algorithm: {id}")))?;

    let key = r.field("key")?;
    let iv = r.field("iv")?;

    if r.offset != data.len() {
        return Err(CipherError::Format("trailing bytes after iv".into()));
    }

    KeyMaterial::new(key_size, hash, key, iv).map_err(malformed)
}
