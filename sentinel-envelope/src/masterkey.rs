//! Master-key provisioning.
//!
//! A gateway instance needs exactly one 32-byte master key at startup.
//! Where that key comes from depends on deployment posture:
//!
//! - [`SealedProvider`] draws the key from an attestation-gated sealed
//!   channel (e.g. a secrets-manager session bound to instance identity).
//! - [`EnvProvider`] reads a hex-encoded key from an environment
//!   variable. Permitted only outside strict mode — convenient for
//!   local/dev, unacceptable for a hardened deployment.
//! - [`EphemeralProvider`] generates a random key at process start and
//!   keeps it in memory only. Data sealed under it does not survive a
//!   restart. Last-resort dev fallback; always logged at `warn`.
//!
//! [`resolve_provider`] applies the selection rule: if strict mode is
//! on, or a sealed channel is available at all, a sealed provider is
//! mandatory and anything else is a configuration error.

use zeroize::Zeroizing;

use crate::aead::KEY_LEN;
use crate::error::CryptoError;

/// A capability for retrieving a master key from an attested, sealed
/// source. Implementations are supplied by the embedding deployment
/// (e.g. a KMS/enclave client); this crate only defines the contract.
pub trait SealedChannel: Send + Sync {
    /// Whether this channel is actually wired up and usable in this
    /// deployment, as opposed to a no-op placeholder.
    fn is_present(&self) -> bool;

    /// Retrieve the master key through the sealed channel.
    fn unseal(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError>;
}

/// Source of the gateway's master key.
pub trait MasterKeyProvider: Send + Sync {
    fn provide(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError>;

    /// Short tag for logging/diagnostics, e.g. `"sealed"`, `"env"`,
    /// `"ephemeral"`.
    fn kind(&self) -> &'static str;
}

/// Draws the master key from a [`SealedChannel`].
pub struct SealedProvider<C: SealedChannel> {
    channel: C,
}

impl<C: SealedChannel> SealedProvider<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }
}

impl<C: SealedChannel> MasterKeyProvider for SealedProvider<C> {
    fn provide(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        self.channel.unseal()
    }

    fn kind(&self) -> &'static str {
        "sealed"
    }
}

/// Reads a hex-encoded 32-byte key from an environment variable.
pub struct EnvProvider {
    var_name: String,
}

impl EnvProvider {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

impl MasterKeyProvider for EnvProvider {
    fn provide(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        let raw = std::env::var(&self.var_name).map_err(|_| CryptoError)?;
        let bytes = hex::decode(raw.trim()).map_err(|_| CryptoError)?;
        let key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| CryptoError)?;
        Ok(Zeroizing::new(key))
    }

    fn kind(&self) -> &'static str {
        "env"
    }
}

/// Generates a random key once, at construction, and holds it for the
/// life of the process. Never persisted.
pub struct EphemeralProvider {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl EphemeralProvider {
    pub fn new() -> Result<Self, CryptoError> {
        let mut key = [0u8; KEY_LEN];
        getrandom::getrandom(&mut key).map_err(|_| CryptoError)?;
        tracing::warn!(
            "sentinel_envelope: no master key source configured, generated an ephemeral \
             in-memory key; secrets sealed under it will not survive a restart"
        );
        Ok(Self {
            key: Zeroizing::new(key),
        })
    }
}

impl MasterKeyProvider for EphemeralProvider {
    fn provide(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        Ok(Zeroizing::new(*self.key))
    }

    fn kind(&self) -> &'static str {
        "ephemeral"
    }
}

/// Error returned when the deployment's configuration cannot satisfy
/// the master-key selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterKeySelectionError;

impl core::fmt::Display for MasterKeySelectionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "strict mode or an available sealed channel requires a sealed master-key provider"
        )
    }
}

impl std::error::Error for MasterKeySelectionError {}

/// Selects a master-key provider given the deployment's posture.
///
/// Rule: `strict_mode OR sealed_channel.is_present() ⇒ sealed required`.
/// Otherwise prefers `env_var` if set, falling back to an ephemeral key
/// with a logged warning.
pub fn resolve_provider<C: SealedChannel + 'static>(
    strict_mode: bool,
    sealed_channel: Option<C>,
    env_var: &str,
) -> Result<Box<dyn MasterKeyProvider>, MasterKeySelectionError> {
    let sealed_available = sealed_channel
        .as_ref()
        .map(SealedChannel::is_present)
        .unwrap_or(false);

    if strict_mode || sealed_available {
        return match sealed_channel {
            Some(channel) if channel.is_present() => {
                Ok(Box::new(SealedProvider::new(channel)))
            }
            _ => Err(MasterKeySelectionError),
        };
    }

    if std::env::var(env_var).is_ok() {
        return Ok(Box::new(EnvProvider::new(env_var)));
    }

    EphemeralProvider::new()
        .map(|p| Box::new(p) as Box<dyn MasterKeyProvider>)
        .map_err(|_| MasterKeySelectionError)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysPresent(Zeroizing<[u8; KEY_LEN]>);

    impl SealedChannel for AlwaysPresent {
        fn is_present(&self) -> bool {
            true
        }

        fn unseal(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
            Ok(Zeroizing::new(*self.0))
        }
    }

    struct Absent;

    impl SealedChannel for Absent {
        fn is_present(&self) -> bool {
            false
        }

        fn unseal(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
            Err(CryptoError)
        }
    }

    #[test]
    fn strict_mode_without_sealed_channel_fails() {
        let result = resolve_provider::<Absent>(true, None, "SENTINEL_TEST_MASTER_KEY_ABSENT");
        assert!(result.is_err());
    }

    #[test]
    fn strict_mode_with_sealed_channel_succeeds() {
        let channel = AlwaysPresent(Zeroizing::new([7u8; KEY_LEN]));
        let provider = resolve_provider(true, Some(channel), "SENTINEL_TEST_MASTER_KEY_UNUSED")
            .expect("sealed provider should resolve");
        assert_eq!(provider.kind(), "sealed");
    }

    #[test]
    fn present_sealed_channel_wins_even_without_strict_mode() {
        let channel = AlwaysPresent(Zeroizing::new([9u8; KEY_LEN]));
        let provider = resolve_provider(false, Some(channel), "SENTINEL_TEST_MASTER_KEY_UNUSED2")
            .expect("sealed provider should resolve");
        assert_eq!(provider.kind(), "sealed");
    }

    #[test]
    fn non_strict_without_sealed_channel_falls_back_to_ephemeral() {
        let provider =
            resolve_provider::<Absent>(false, Some(Absent), "SENTINEL_TEST_MASTER_KEY_UNSET")
                .expect("ephemeral fallback should resolve");
        assert_eq!(provider.kind(), "ephemeral");
    }
}
