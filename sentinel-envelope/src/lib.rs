//! Envelope cryptography for the sentinel gateway: AEAD sealing,
//! data-key wrapping, opaque-token hashing, and master-key
//! provisioning.
//!
//! Everything in this crate follows one rule: a caller on the outside
//! of a failed operation learns only that it failed, never why.

pub mod aad;
pub mod aead;
pub mod error;
pub mod masterkey;
pub mod token;
pub mod wrap;

pub use aead::{aead_open, aead_seal, generate_iv, IV_LEN, KEY_LEN};
pub use error::CryptoError;
pub use masterkey::{
    resolve_provider, EnvProvider, EphemeralProvider, MasterKeyProvider, MasterKeySelectionError,
    SealedChannel, SealedProvider,
};
pub use token::{
    display_prefix, equal_constant_time, generate_api_key, generate_session_token,
    hash_api_key, hash_session_token, API_KEY_PREFIX, API_KEY_TOTAL_LEN, PREFIX_DISPLAY_LEN,
};
pub use wrap::{generate_data_key, unwrap, wrap};
