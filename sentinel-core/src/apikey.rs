//! Issue/list/revoke/validate opaque API keys.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{GatewayError, RepoError};
use crate::model::{ApiKey, ApiKeyId, UserId};
use crate::repo::ApiKeyRepo;

/// The one-time response to a successful [`ApiKeyManager::issue`] call.
/// The plaintext `key` is never retrievable again after this point.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub id: ApiKeyId,
    pub name: String,
    pub key: String,
    pub prefix: String,
    pub scopes: BTreeSet<String>,
    pub created_at: chrono::DateTime<Utc>,
}

pub struct ApiKeyManager<R: ApiKeyRepo> {
    repo: Arc<R>,
}

impl<R: ApiKeyRepo> ApiKeyManager<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn issue(
        &self,
        user_id: &UserId,
        name: &str,
        scopes: BTreeSet<String>,
    ) -> Result<IssuedApiKey, GatewayError> {
        if name.trim().is_empty() {
            return Err(GatewayError::InvalidInput("name must not be empty".into()));
        }

        let plaintext = sentinel_envelope::generate_api_key()?;
        let prefix = sentinel_envelope::display_prefix(&plaintext);
        let hash = sentinel_envelope::hash_api_key(&plaintext).to_vec();
        let created_at = Utc::now();

        let record = ApiKey {
            id: uuid_like(user_id, name, created_at),
            user_id: user_id.clone(),
            name: name.to_string(),
            token_hash: hash,
            prefix: prefix.clone(),
            scopes: scopes.clone(),
            created_at,
            last_used_at: None,
            revoked_at: None,
        };

        let stored = self.repo.create_api_key(record).await?;

        Ok(IssuedApiKey {
            id: stored.id,
            name: stored.name,
            key: plaintext,
            prefix: stored.prefix,
            scopes: stored.scopes,
            created_at: stored.created_at,
        })
    }

    /// Stored records minus the hash — callers never see `token_hash`.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<ApiKey>, GatewayError> {
        let mut keys = self.repo.list_api_keys_by_user(user_id).await?;
        for key in &mut keys {
            key.token_hash.clear();
        }
        Ok(keys)
    }

    /// Idempotent: revoking an already-revoked (or nonexistent-for-this-
    /// user) key is not an error.
    pub async fn revoke(&self, user_id: &UserId, id: &ApiKeyId) -> Result<(), GatewayError> {
        match self.repo.revoke_api_key(id, user_id, Utc::now()).await {
            Ok(()) | Err(RepoError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Hash the presented token, look it up, and reject anything
    /// revoked. Timing reveals whether a hash exists, never what it
    /// hashes from.
    pub async fn validate(&self, presented_token: &str) -> Result<ApiKey, GatewayError> {
        let hash = sentinel_envelope::hash_api_key(presented_token);
        let key = self
            .repo
            .get_api_key_by_hash(&hash)
            .await?
            .ok_or(GatewayError::Unauthorized)?;

        if key.is_revoked() {
            return Err(GatewayError::Unauthorized);
        }

        let repo = Arc::clone(&self.repo);
        let id = key.id.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.touch_api_key_last_used(&id, Utc::now()).await {
                tracing::warn!(error = %e, key_id = %id, "best-effort last_used_at touch failed");
            }
        });

        Ok(key)
    }
}

fn uuid_like(user_id: &str, name: &str, at: chrono::DateTime<Utc>) -> String {
    let seed = format!("{user_id}|{name}|{}", at.timestamp_nanos_opt().unwrap_or_default());
    let digest = sentinel_envelope::hash_session_token(&seed);
    format!("apikey_{}", hex::encode(&digest[..16]))
}
