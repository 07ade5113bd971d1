//! Opaque bearer-credential generation and domain-separated hashing.
//!
//! API keys and session tokens are never stored in plaintext. Only a
//! SHA-256 digest of the token, salted by a fixed domain tag, is kept
//! at rest; comparisons against that digest run in constant time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// `"sl_"` + 64 lowercase hex chars of entropy.
pub const API_KEY_PREFIX: &str = "sl_";
pub const API_KEY_ENTROPY_HEX_LEN: usize = 64;
pub const API_KEY_TOTAL_LEN: usize = API_KEY_PREFIX.len() + API_KEY_ENTROPY_HEX_LEN;

/// Display prefix shown back to the user: `"sl_"` plus the first 8 hex
/// chars of the entropy, e.g. `sl_a1b2c3d4`.
pub const PREFIX_DISPLAY_LEN: usize = API_KEY_PREFIX.len() + 8;

const API_KEY_DOMAIN: &[u8] = b"sentinel|token|apikey|v1";
const SESSION_DOMAIN: &[u8] = b"sentinel|token|session|v1";

/// Generate a new plaintext API key: `sl_` followed by 64 lowercase hex
/// digits of random entropy (32 bytes).
pub fn generate_api_key() -> Result<String, crate::error::CryptoError> {
    let mut entropy = [0u8; 32];
    getrandom::getrandom(&mut entropy).map_err(|_| crate::error::CryptoError)?;
    Ok(format!("{API_KEY_PREFIX}{}", hex::encode(entropy)))
}

/// Generate a new opaque session token: 32 bytes of random entropy,
/// hex-encoded, with no fixed prefix.
pub fn generate_session_token() -> Result<String, crate::error::CryptoError> {
    let mut entropy = [0u8; 32];
    getrandom::getrandom(&mut entropy).map_err(|_| crate::error::CryptoError)?;
    Ok(hex::encode(entropy))
}

/// The short, non-secret prefix shown to a user after key issuance, so
/// they can recognize the key in a list without ever seeing it again.
pub fn display_prefix(plaintext_api_key: &str) -> String {
    plaintext_api_key
        .chars()
        .take(PREFIX_DISPLAY_LEN)
        .collect()
}

fn domain_hash(domain: &[u8], token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Hash a plaintext API key for at-rest storage.
pub fn hash_api_key(plaintext: &str) -> [u8; 32] {
    domain_hash(API_KEY_DOMAIN, plaintext)
}

/// Hash a plaintext session token for at-rest storage.
pub fn hash_session_token(plaintext: &str) -> [u8; 32] {
    domain_hash(SESSION_DOMAIN, plaintext)
}

/// Constant-time equality check between a computed hash and a stored
/// one. Use this instead of `==` for anything derived from a
/// caller-supplied credential.
pub fn equal_constant_time(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
