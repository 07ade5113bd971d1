//! AEAD: AES-256-GCM (128-bit tag, 96-bit IV).

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use getrandom::getrandom;

use crate::error::CryptoError;

pub const IV_LEN: usize = 12;
pub const KEY_LEN: usize = 32;

/// Generate a fresh random 12-byte IV. Callers must use a new IV per seal.
pub fn generate_iv() -> Result<[u8; IV_LEN], CryptoError> {
    let mut iv = [0u8; IV_LEN];
    getrandom(&mut iv).map_err(|_| CryptoError)?;
    Ok(iv)
}

/// Authenticated encryption under `key` with the given IV and associated data.
pub fn aead_seal(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError)?;
    let nonce = Nonce::from_slice(iv);
    let payload = Payload { msg: plaintext, aad };
    cipher.encrypt(nonce, payload).map_err(|_| CryptoError)
}

/// Authenticated decryption. Fails uniformly on any tag mismatch.
pub fn aead_open(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError)?;
    let nonce = Nonce::from_slice(iv);
    let payload = Payload { msg: ciphertext, aad };
    cipher.decrypt(nonce, payload).map_err(|_| CryptoError)
}
