//! Random password generation, independent of any engine state.

use crate::crypto::{EntropySource, OsEntropy};
use crate::error::{CipherError, Result};

/// Characters used by [`generate_default_password`].
pub const DEFAULT_CHARSET: &str = "1234567890-=qwertyuiop[]asdfghjkl;'zxcvbnm,./~!@#$%^&*()_+QWERTYUIOP{}|ASDFGHJKL:ZXCVBNM<>?";

/// Generates a password of `length` characters drawn uniformly from `charset`.
///
/// # Errors
///
/// Returns [`CipherError::PasswordGeneration`] if `charset` is empty and
/// `length` is non-zero, or [`CipherError::Entropy`] if the OS RNG fails.
pub fn generate_password(length: usize, charset: &str) -> Result<String> {
    generate_password_with(&mut OsEntropy, length, charset)
}

/// [`generate_password`] over [`DEFAULT_CHARSET`].
pub fn generate_default_password(length: usize) -> Result<String> {
    generate_password(length, DEFAULT_CHARSET)
}

/// [`generate_password`] with an explicit entropy source.
pub fn generate_password_with(
    entropy: &mut dyn EntropySource,
    length: usize,
    charset: &str,
) -> Result<String> {
    let chars: Vec<char> = charset.chars().collect();
    if chars.is_empty() {
        if length == 0 {
            return Ok(String::new());
        }
        return Err(CipherError::PasswordGeneration("charset is empty".into()));
    }
    let bound = u32::try_from(chars.len())
        .map_err(|_| CipherError::PasswordGeneration("charset is too large".into()))?;

    let mut out = String::with_capacity(length);
    for _ in 0..length {
        let idx = entropy.below(bound)? as usize;
        out.push(chars[idx]);
    }
    Ok(out)
}
