//! The persistence contract, split by capability so a component holds
//! only the repository it actually needs.
//!
//! Implementations are an external collaborator (a PostgREST-style
//! adapter in production, [`sentinel_repo_memory`] for tests and local
//! development). The core treats every implementation as an oracle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RepoError;
use crate::model::{
    ApiKey, ApiKeyId, AuditEntry, Secret, SecretId, SecretPermissions, Session, SessionId, User,
    UserId,
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, principal: &str) -> Result<User, RepoError>;
    async fn get_user_by_principal(&self, principal: &str) -> Result<Option<User>, RepoError>;
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, RepoError>;
    async fn update_user_nonce(&self, id: &UserId, nonce: &str) -> Result<(), RepoError>;
    async fn touch_user_last_seen(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), RepoError>;
    async fn set_user_role(&self, id: &UserId, role: Option<String>) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn create_session(&self, session: Session) -> Result<Session, RepoError>;
    async fn get_session_by_token_hash(
        &self,
        token_hash: &[u8],
    ) -> Result<Option<Session>, RepoError>;
    async fn touch_session_activity(
        &self,
        id: &SessionId,
        at: DateTime<Utc>,
    ) -> Result<(), RepoError>;
    async fn delete_session(&self, id: &SessionId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ApiKeyRepo: Send + Sync {
    async fn create_api_key(&self, key: ApiKey) -> Result<ApiKey, RepoError>;
    async fn list_api_keys_by_user(&self, user_id: &UserId) -> Result<Vec<ApiKey>, RepoError>;
    async fn get_api_key_by_hash(&self, token_hash: &[u8]) -> Result<Option<ApiKey>, RepoError>;
    async fn revoke_api_key(
        &self,
        id: &ApiKeyId,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepoError>;
    async fn touch_api_key_last_used(
        &self,
        id: &ApiKeyId,
        at: DateTime<Utc>,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SecretRepo: Send + Sync {
    async fn create_secret(&self, secret: Secret) -> Result<Secret, RepoError>;
    async fn update_secret(&self, secret: Secret) -> Result<Secret, RepoError>;
    async fn get_secret(&self, user_id: &UserId, name: &str) -> Result<Option<Secret>, RepoError>;
    async fn list_secrets_by_user(&self, user_id: &UserId) -> Result<Vec<Secret>, RepoError>;
    async fn delete_secret(&self, user_id: &UserId, name: &str) -> Result<(), RepoError>;
    async fn get_secret_permissions(
        &self,
        secret_id: &SecretId,
    ) -> Result<SecretPermissions, RepoError>;
    async fn set_secret_permissions(
        &self,
        secret_id: &SecretId,
        services: SecretPermissions,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), RepoError>;
    async fn list_audit_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, RepoError>;
    async fn list_audit_by_secret(
        &self,
        secret_id: &SecretId,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, RepoError>;
}

/// The full repository surface, for components (e.g. the server's
/// `AppState`) that need every capability at once.
pub trait Repository: UserRepo + SessionRepo + ApiKeyRepo + SecretRepo + AuditRepo {}

impl<T> Repository for T where T: UserRepo + SessionRepo + ApiKeyRepo + SecretRepo + AuditRepo {}
