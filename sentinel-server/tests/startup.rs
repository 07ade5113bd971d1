//! Ties `config::load` together with `resolve_provider` the same way
//! `main()` sequences them at startup — covers the strict-mode-with-no-
//! sealed-channel exit path without actually spawning a process.

use sentinel_envelope::{resolve_provider, CryptoError, SealedChannel, KEY_LEN};

/// `STRICT_MODE` is a process-global environment variable; serialize the
/// tests in this file that touch it so they don't observe each other's
/// writes.
static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

struct NoSealedChannel;

impl SealedChannel for NoSealedChannel {
    fn is_present(&self) -> bool {
        false
    }

    fn unseal(&self) -> Result<zeroize::Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        Err(CryptoError)
    }
}

#[test]
fn strict_mode_from_bare_env_var_with_no_sealed_channel_refuses_a_master_key() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("STRICT_MODE", "true");
    let loaded = sentinel_server::config::load(Some("/nonexistent/sentinel.toml"), None);
    std::env::remove_var("STRICT_MODE");

    let settings = loaded.expect("bare STRICT_MODE=true is a valid boolean, config load must succeed");
    assert!(settings.strict_mode);

    let resolved = resolve_provider(
        settings.strict_mode,
        Some(NoSealedChannel),
        sentinel_server::config::MASTER_KEY_ENV,
    );
    assert!(
        resolved.is_err(),
        "strict mode with no sealed channel present must refuse to select a master key"
    );
}

#[test]
fn non_strict_mode_falls_back_to_an_ephemeral_key_when_no_env_var_is_set() {
    let _guard = ENV_LOCK.lock().unwrap();
    let loaded = sentinel_server::config::load(Some("/nonexistent/sentinel.toml"), None)
        .expect("defaults load cleanly");
    assert!(!loaded.strict_mode);

    let resolved = resolve_provider(loaded.strict_mode, Some(NoSealedChannel), "SENTINEL_TEST_MASTER_KEY_UNSET");
    assert!(resolved.is_ok(), "non-strict mode must still start via the ephemeral fallback");
}
