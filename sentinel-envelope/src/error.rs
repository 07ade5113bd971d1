//! Error types for envelope crypto.
//!
//! Oracle discipline: every failure mode in this crate — bad AEAD tag,
//! wrong-length key, malformed wire input — collapses to the same
//! [`CryptoError`]. Callers must not be able to distinguish "tampered"
//! from "malformed" from the error alone.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoError;

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crypto operation failed")
    }
}

impl std::error::Error for CryptoError {}
