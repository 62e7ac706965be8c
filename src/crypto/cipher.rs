//! Stateless AES encryption over resolved [`KeyMaterial`].
//!
//! Every call builds its own cipher context, so a shared `&KeyMaterial` can be
//! used from several threads at once.
//!
//! - CBC: PKCS#7 padding, IV as chaining vector.
//! - GCM: 16-byte IV used as nonce, 128-bit tag appended to the ciphertext.

use super::IV_LEN;
use super::material::KeyMaterial;
use crate::error::{CipherError, Result};
use crate::options::{Algorithm, KeySize};
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::AesGcm;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit, Nonce};
use zeroize::Zeroizing;

type Aes128Gcm16 = AesGcm<Aes128, U16>;
type Aes192Gcm16 = AesGcm<Aes192, U16>;
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Encrypt plaintext
pub fn encrypt(algorithm: Algorithm, material: &KeyMaterial, plaintext: &[u8]) -> Result<Vec<u8>> {
    let (key, iv) = (material.key(), material.iv());
    match algorithm {
        Algorithm::Cbc => match material.key_size() {
            KeySize::Aes128 => {
                Ok(cbc_encryptor::<Aes128>(key, iv)?.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
            }
            KeySize::Aes192 => {
                Ok(cbc_encryptor::<Aes192>(key, iv)?.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
            }
            KeySize::Aes256 => {
                Ok(cbc_encryptor::<Aes256>(key, iv)?.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
            }
        },
        Algorithm::Gcm => match material.key_size() {
            KeySize::Aes128 => gcm_seal(&gcm_cipher::<Aes128Gcm16>(key)?, iv, plaintext),
            KeySize::Aes192 => gcm_seal(&gcm_cipher::<Aes192Gcm16>(key)?, iv, plaintext),
            KeySize::Aes256 => gcm_seal(&gcm_cipher::<Aes256Gcm16>(key)?, iv, plaintext),
        },
    }
}

/// Decrypt ciphertext
pub fn decrypt(
    algorithm: Algorithm,
    material: &KeyMaterial,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let (key, iv) = (material.key(), material.iv());
    let plaintext = match algorithm {
        Algorithm::Cbc => cbc_decrypt(material.key_size(), key, iv, ciphertext)?,
        Algorithm::Gcm => match material.key_size() {
            KeySize::Aes128 => gcm_open(&gcm_cipher::<Aes128Gcm16>(key)?, iv, ciphertext)?,
            KeySize::Aes192 => gcm_open(&gcm_cipher::<Aes192Gcm16>(key)?, iv, ciphertext)?,
            KeySize::Aes256 => gcm_open(&gcm_cipher::<Aes256Gcm16>(key)?, iv, ciphertext)?,
        },
    };
    Ok(Zeroizing::new(plaintext))
}

fn cbc_decrypt(
    key_size: KeySize,
    key: &[u8],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let unpadded = match key_size {
        KeySize::Aes128 => {
            cbc_decryptor::<Aes128>(key, iv)?.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        }
        KeySize::Aes192 => {
            cbc_decryptor::<Aes192>(key, iv)?.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        }
        KeySize::Aes256 => {
            cbc_decryptor::<Aes256>(key, iv)?.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        }
    };
    unpadded.map_err(|_| CipherError::Decryption("bad padding or truncated ciphertext".into()))
}

fn cbc_encryptor<C>(key: &[u8], iv: &[u8; IV_LEN]) -> Result<cbc::Encryptor<C>>
where
    cbc::Encryptor<C>: KeyIvInit,
    C: BlockEncryptMut + BlockCipher,
{
    cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CipherError::InvalidKeyMaterial("key length rejected by AES-CBC".into()))
}

fn cbc_decryptor<C>(key: &[u8], iv: &[u8; IV_LEN]) -> Result<cbc::Decryptor<C>>
where
    cbc::Decryptor<C>: KeyIvInit,
    C: BlockDecryptMut + BlockCipher,
{
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CipherError::InvalidKeyMaterial("key length rejected by AES-CBC".into()))
}

fn gcm_cipher<A: KeyInit>(key: &[u8]) -> Result<A> {
    A::new_from_slice(key)
        .map_err(|_| CipherError::InvalidKeyMaterial("key length rejected by AES-GCM".into()))
}

fn gcm_seal<A: Aead>(cipher: &A, iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    cipher
        .encrypt(Nonce::<A>::from_slice(iv), plaintext)
        .map_err(|_| CipherError::Encryption("AES-GCM encryption failed".into()))
}

fn gcm_open<A: Aead>(cipher: &A, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
    cipher
        .decrypt(Nonce::<A>::from_slice(iv), ciphertext)
        .map_err(|_| CipherError::Authentication)
}
