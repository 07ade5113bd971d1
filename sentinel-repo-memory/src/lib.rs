//! An in-memory [`sentinel_core::Repository`] implementation: a handful
//! of `RwLock`-guarded maps with no persistence across restarts. Used by
//! the server binary's local/dev mode and by the workspace's own tests;
//! a real deployment points at a PostgREST-style adapter instead.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use sentinel_core::model::{
    ApiKey, ApiKeyId, AuditEntry, Secret, SecretId, SecretPermissions, Session, SessionId, User,
    UserId,
};
use sentinel_core::error::RepoError;
use sentinel_core::repo::{ApiKeyRepo, AuditRepo, SecretRepo, SessionRepo, UserRepo};

#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<HashMap<UserId, User>>,
    users_by_principal: RwLock<HashMap<String, UserId>>,
    sessions: RwLock<HashMap<SessionId, Session>>,
    api_keys: RwLock<HashMap<ApiKeyId, ApiKey>>,
    secrets: RwLock<HashMap<(UserId, String), Secret>>,
    secret_permissions: RwLock<HashMap<SecretId, SecretPermissions>>,
    audit: RwLock<Vec<AuditEntry>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryRepository {
    async fn create_user(&self, principal: &str) -> Result<User, RepoError> {
        let mut by_principal = self.users_by_principal.write().await;
        if by_principal.contains_key(principal) {
            return Err(RepoError::InvalidInput("principal already registered".into()));
        }
        let id = format!("user_{}", self.users.read().await.len() + 1);
        let user = User {
            id: id.clone(),
            principal: principal.to_string(),
            role: None,
            nonce: String::new(),
            last_seen_at: Utc::now(),
        };
        by_principal.insert(principal.to_string(), id.clone());
        self.users.write().await.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user_by_principal(&self, principal: &str) -> Result<Option<User>, RepoError> {
        let by_principal = self.users_by_principal.read().await;
        match by_principal.get(principal) {
            Some(id) => Ok(self.users.read().await.get(id).cloned()),
            None => Ok(None),
        }
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn update_user_nonce(&self, id: &UserId, nonce: &str) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or(RepoError::NotFound)?;
        user.nonce = nonce.to_string();
        Ok(())
    }

    async fn touch_user_last_seen(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or(RepoError::NotFound)?;
        user.last_seen_at = at;
        Ok(())
    }

    async fn set_user_role(&self, id: &UserId, role: Option<String>) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or(RepoError::NotFound)?;
        user.role = role;
        Ok(())
    }
}

#[async_trait]
impl SessionRepo for MemoryRepository {
    async fn create_session(&self, session: Session) -> Result<Session, RepoError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get_session_by_token_hash(
        &self,
        token_hash: &[u8],
    ) -> Result<Option<Session>, RepoError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn touch_session_activity(
        &self,
        id: &SessionId,
        at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or(RepoError::NotFound)?;
        session.last_active_at = at;
        Ok(())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), RepoError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ApiKeyRepo for MemoryRepository {
    async fn create_api_key(&self, key: ApiKey) -> Result<ApiKey, RepoError> {
        self.api_keys.write().await.insert(key.id.clone(), key.clone());
        Ok(key)
    }

    async fn list_api_keys_by_user(&self, user_id: &UserId) -> Result<Vec<ApiKey>, RepoError> {
        let keys = self.api_keys.read().await;
        Ok(keys.values().filter(|k| &k.user_id == user_id).cloned().collect())
    }

    async fn get_api_key_by_hash(&self, token_hash: &[u8]) -> Result<Option<ApiKey>, RepoError> {
        let keys = self.api_keys.read().await;
        Ok(keys.values().find(|k| k.token_hash == token_hash).cloned())
    }

    async fn revoke_api_key(
        &self,
        id: &ApiKeyId,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let mut keys = self.api_keys.write().await;
        match keys.get_mut(id) {
            Some(key) if &key.user_id == user_id => {
                key.revoked_at = Some(at);
                Ok(())
            }
            Some(_) => Err(RepoError::InvalidInput("key does not belong to caller".into())),
            None => Err(RepoError::NotFound),
        }
    }

    async fn touch_api_key_last_used(
        &self,
        id: &ApiKeyId,
        at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let mut keys = self.api_keys.write().await;
        let key = keys.get_mut(id).ok_or(RepoError::NotFound)?;
        key.last_used_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl SecretRepo for MemoryRepository {
    async fn create_secret(&self, secret: Secret) -> Result<Secret, RepoError> {
        let key = (secret.user_id.clone(), secret.name.clone());
        let mut secrets = self.secrets.write().await;
        if secrets.contains_key(&key) {
            return Err(RepoError::InvalidInput("secret name already exists".into()));
        }
        secrets.insert(key, secret.clone());
        Ok(secret)
    }

    async fn update_secret(&self, secret: Secret) -> Result<Secret, RepoError> {
        let key = (secret.user_id.clone(), secret.name.clone());
        let mut secrets = self.secrets.write().await;
        if !secrets.contains_key(&key) {
            return Err(RepoError::NotFound);
        }
        secrets.insert(key, secret.clone());
        Ok(secret)
    }

    async fn get_secret(&self, user_id: &UserId, name: &str) -> Result<Option<Secret>, RepoError> {
        let secrets = self.secrets.read().await;
        Ok(secrets.get(&(user_id.clone(), name.to_string())).cloned())
    }

    async fn list_secrets_by_user(&self, user_id: &UserId) -> Result<Vec<Secret>, RepoError> {
        let secrets = self.secrets.read().await;
        Ok(secrets
            .values()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_secret(&self, user_id: &UserId, name: &str) -> Result<(), RepoError> {
        let mut secrets = self.secrets.write().await;
        let removed = secrets.remove(&(user_id.clone(), name.to_string()));
        if let Some(secret) = removed {
            self.secret_permissions.write().await.remove(&secret.id);
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }

    async fn get_secret_permissions(
        &self,
        secret_id: &SecretId,
    ) -> Result<SecretPermissions, RepoError> {
        Ok(self
            .secret_permissions
            .read()
            .await
            .get(secret_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_secret_permissions(
        &self,
        secret_id: &SecretId,
        services: SecretPermissions,
    ) -> Result<(), RepoError> {
        self.secret_permissions
            .write()
            .await
            .insert(secret_id.clone(), services);
        Ok(())
    }
}

#[async_trait]
impl AuditRepo for MemoryRepository {
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), RepoError> {
        self.audit.write().await.push(entry);
        Ok(())
    }

    async fn list_audit_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, RepoError> {
        let audit = self.audit.read().await;
        Ok(audit
            .iter()
            .rev()
            .filter(|e| &e.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_audit_by_secret(
        &self,
        secret_id: &SecretId,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, RepoError> {
        let audit = self.audit.read().await;
        Ok(audit
            .iter()
            .rev()
            .filter(|e| e.secret_id.as_deref() == Some(secret_id.as_str()))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::model::{AlgorithmTag, AuditAction, AuditOutcome};

    fn sample_secret(user_id: &str, name: &str, version: u32) -> Secret {
        let now = Utc::now();
        Secret {
            id: format!("secret_{name}"),
            user_id: user_id.to_string(),
            name: name.to_string(),
            ciphertext: vec![1, 2, 3],
            wrapped_data_key: vec![4, 5, 6],
            iv: vec![0u8; 12],
            algorithm_tag: AlgorithmTag::Aes256GcmV1,
            version,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn set_user_role_persists_on_the_user_record() {
        let repo = MemoryRepository::new();
        let user = repo.create_user("principal-1").await.unwrap();
        assert_eq!(user.role, None);

        repo.set_user_role(&user.id, Some("admin".to_string())).await.unwrap();
        let fetched = repo.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.role, Some("admin".to_string()));
    }

    #[tokio::test]
    async fn secret_name_is_unique_per_user() {
        let repo = MemoryRepository::new();
        repo.create_secret(sample_secret("user-1", "DB_URL", 1)).await.unwrap();
        let dup = repo.create_secret(sample_secret("user-1", "DB_URL", 1)).await;
        assert!(dup.is_err());

        // Same name, different user: allowed.
        repo.create_secret(sample_secret("user-2", "DB_URL", 1)).await.unwrap();
    }

    #[tokio::test]
    async fn list_reflects_create_then_delete() {
        let repo = MemoryRepository::new();
        repo.create_secret(sample_secret("user-1", "DB_URL", 1)).await.unwrap();
        assert_eq!(repo.list_secrets_by_user(&"user-1".to_string()).await.unwrap().len(), 1);

        repo.delete_secret(&"user-1".to_string(), "DB_URL").await.unwrap();
        assert_eq!(repo.list_secrets_by_user(&"user-1".to_string()).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn audit_list_is_owner_scoped_and_newest_first() {
        let repo = MemoryRepository::new();
        for (user, action) in [
            ("user-1", AuditAction::Create),
            ("user-2", AuditAction::Create),
            ("user-1", AuditAction::Read),
        ] {
            repo.append_audit(AuditEntry {
                id: format!("audit_{action:?}_{user}"),
                user_id: user.to_string(),
                secret_id: None,
                action,
                timestamp: Utc::now(),
                ip: "127.0.0.1".into(),
                user_agent: "test".into(),
                outcome: AuditOutcome::Success,
            })
            .await
            .unwrap();
        }

        let entries = repo.list_audit_by_user(&"user-1".to_string(), 100).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::Read);
    }
}
