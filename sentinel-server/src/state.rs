//! Shared server state: `AppState` plus the `Shared = Arc<AppState>`
//! alias handlers and middleware extract it through.

use std::collections::BTreeMap;
use std::sync::Arc;

use sentinel_core::repo::Repository;
use sentinel_core::{ApiKeyManager, Authenticator, RouteTable, SecretsManager, ServiceTokens};
use sentinel_envelope::{MasterKeyProvider, KEY_LEN};
use zeroize::Zeroizing;

use crate::rate_limit::RateLimiter;

pub struct AppState<R: Repository + 'static> {
    pub repo: Arc<R>,
    pub api_keys: Arc<ApiKeyManager<R>>,
    pub secrets: Arc<SecretsManager<R>>,
    pub authenticator: Arc<Authenticator<R>>,
    master_key: Zeroizing<[u8; KEY_LEN]>,
    pub route_table: RouteTable,
    pub rate_limiter: RateLimiter,
    pub http_client: reqwest::Client,
    pub strict_mode: bool,
    /// Principal -> role, applied once when a user is first created.
    pub role_assignments: BTreeMap<String, String>,
}

pub type Shared<R> = Arc<AppState<R>>;

impl<R: Repository + 'static> AppState<R> {
    pub fn new(
        repo: Arc<R>,
        master_key_provider: &dyn MasterKeyProvider,
        route_table: RouteTable,
        service_tokens: ServiceTokens,
        internal_subnets: Vec<ipnetwork::IpNetwork>,
        rate_limit_rps: f64,
        rate_limit_burst: u32,
        strict_mode: bool,
        role_assignments: BTreeMap<String, String>,
    ) -> Result<Self, sentinel_envelope::CryptoError> {
        let master_key = master_key_provider.provide()?;
        let api_keys = Arc::new(ApiKeyManager::new(Arc::clone(&repo)));
        let secrets = Arc::new(SecretsManager::new(Arc::clone(&repo)));
        let authenticator = Arc::new(Authenticator::new(
            Arc::clone(&api_keys),
            Arc::clone(&repo),
            service_tokens,
            internal_subnets,
        ));

        Ok(Self {
            repo,
            api_keys,
            secrets,
            authenticator,
            master_key,
            route_table,
            rate_limiter: RateLimiter::new(rate_limit_rps, rate_limit_burst),
            http_client: reqwest::Client::new(),
            strict_mode,
            role_assignments,
        })
    }

    /// Borrow the master key for the duration of a single crypto call.
    /// Callers must not copy these bytes into a longer-lived location,
    /// per the sealed-key-semantics design note.
    pub fn master_key(&self) -> &[u8; KEY_LEN] {
        &self.master_key
    }
}
