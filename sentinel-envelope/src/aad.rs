//! Associated-data construction for sealed secrets.
//!
//! Binds each ciphertext to the record it belongs to so that swapping
//! one secret's bytes for another's — even under the same key — fails
//! authentication. Encoding:
//!
//!   `b"sentinel|secret|v1|" || user_id || 0x1F || name || 0x1F || version_be`
//!
//! `0x1F` (ASCII unit separator) cannot appear in `user_id` or `name`
//! once those are validated at the API boundary, so the join is
//! unambiguous without length-prefixing each field.

const SECRET_AAD_PREFIX: &[u8] = b"sentinel|secret|v1|";
const FIELD_SEP: u8 = 0x1F;

/// Build the associated data for a secret's sealed payload.
pub fn build_secret_aad(user_id: &str, name: &str, version: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        SECRET_AAD_PREFIX.len() + user_id.len() + 1 + name.len() + 1 + 4,
    );
    out.extend_from_slice(SECRET_AAD_PREFIX);
    out.extend_from_slice(user_id.as_bytes());
    out.push(FIELD_SEP);
    out.extend_from_slice(name.as_bytes());
    out.push(FIELD_SEP);
    out.extend_from_slice(&version.to_be_bytes());
    out
}
