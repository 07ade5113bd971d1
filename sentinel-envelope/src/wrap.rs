//! Wrap/unwrap of 32-byte data keys under the 32-byte master key.
//!
//! Wire format: `iv(12) || aead_ciphertext`. The IV is prepended rather
//! than stored alongside so a single opaque byte string round-trips
//! through storage without a second column.

use zeroize::Zeroizing;

use crate::aead::{aead_open, aead_seal, generate_iv, IV_LEN, KEY_LEN};
use crate::error::CryptoError;

const WRAP_AAD: &[u8] = b"sentinel|wrap|v1";

/// Authenticated-encrypt `data_key` under `master_key`, returning
/// `iv || ciphertext`. Fails with [`CryptoError`] if `master_key` is not
/// exactly 32 bytes.
pub fn wrap(master_key: &[u8], data_key: &[u8; KEY_LEN]) -> Result<Vec<u8>, CryptoError> {
    let master: &[u8; KEY_LEN] = master_key.try_into().map_err(|_| CryptoError)?;
    let iv = generate_iv()?;
    let ct = aead_seal(master, &iv, data_key, WRAP_AAD)?;
    let mut out = Vec::with_capacity(IV_LEN + ct.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ct);
    Ok(out)
}

/// Inverse of [`wrap`]. Never reveals whether a failure was a length
/// error or an authentication-tag mismatch.
pub fn unwrap(master_key: &[u8], wrapped: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let master: &[u8; KEY_LEN] = master_key.try_into().map_err(|_| CryptoError)?;
    if wrapped.len() <= IV_LEN {
        return Err(CryptoError);
    }
    let (iv_bytes, ct) = wrapped.split_at(IV_LEN);
    let iv: [u8; IV_LEN] = iv_bytes.try_into().map_err(|_| CryptoError)?;
    let pt = aead_open(master, &iv, ct, WRAP_AAD)?;
    let data_key: [u8; KEY_LEN] = pt.as_slice().try_into().map_err(|_| CryptoError)?;
    Ok(Zeroizing::new(data_key))
}

/// Generate a fresh random 32-byte data key.
pub fn generate_data_key() -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let mut key = [0u8; KEY_LEN];
    getrandom::getrandom(&mut key).map_err(|_| CryptoError)?;
    Ok(Zeroizing::new(key))
}
