//! Resolves an incoming request to an identity, in priority order:
//! internal service token, API key, session cookie, wallet-signature
//! challenge, anonymous.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use ipnetwork::IpNetwork;

use crate::apikey::ApiKeyManager;
use crate::error::GatewayError;
use crate::model::{Session, UserId};
use crate::repo::{ApiKeyRepo, SessionRepo, UserRepo};

/// The resolved caller identity for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User { id: UserId, role: Option<String> },
    Service { name: String },
}

/// Everything the authenticator needs to know about the physical
/// request, gathered by the HTTP layer before resolution begins.
pub struct RequestContext<'a> {
    pub service_token_header: Option<&'a str>,
    pub api_key_header: Option<&'a str>,
    pub bearer_token: Option<&'a str>,
    pub session_cookie: Option<&'a str>,
    pub socket_ip: IpAddr,
}

/// Per-service expected internal tokens, configured at startup.
pub type ServiceTokens = BTreeMap<String, String>;

pub struct Authenticator<R: ApiKeyRepo + SessionRepo + UserRepo> {
    api_keys: Arc<ApiKeyManager<R>>,
    repo: Arc<R>,
    service_tokens: ServiceTokens,
    internal_subnets: Vec<IpNetwork>,
    session_ttl_touch: bool,
}

impl<R: ApiKeyRepo + SessionRepo + UserRepo> Authenticator<R> {
    pub fn new(
        api_keys: Arc<ApiKeyManager<R>>,
        repo: Arc<R>,
        service_tokens: ServiceTokens,
        internal_subnets: Vec<IpNetwork>,
    ) -> Self {
        Self {
            api_keys,
            repo,
            service_tokens,
            internal_subnets,
            session_ttl_touch: true,
        }
    }

    pub async fn resolve(&self, ctx: &RequestContext<'_>) -> Result<Identity, GatewayError> {
        if let Some(header) = ctx.service_token_header {
            return self.resolve_service_token(header, ctx.socket_ip).await;
        }

        if let Some(presented) = ctx.bearer_token.or(ctx.api_key_header) {
            let key = self.api_keys.validate(presented).await?;
            let role = self.lookup_role(&key.user_id).await;
            return Ok(Identity::User {
                id: key.user_id,
                role,
            });
        }

        if let Some(cookie) = ctx.session_cookie {
            return self.resolve_session(cookie).await;
        }

        Ok(Identity::Anonymous)
    }

    async fn resolve_service_token(
        &self,
        header: &str,
        socket_ip: IpAddr,
    ) -> Result<Identity, GatewayError> {
        let is_internal = self
            .internal_subnets
            .iter()
            .any(|net| net.contains(socket_ip));
        if !is_internal {
            return Err(GatewayError::Unauthorized);
        }

        let (name, token) = header.split_once(':').ok_or(GatewayError::Unauthorized)?;
        let expected = self
            .service_tokens
            .get(name)
            .ok_or(GatewayError::Unauthorized)?;

        if !sentinel_envelope::equal_constant_time(token.as_bytes(), expected.as_bytes()) {
            return Err(GatewayError::Unauthorized);
        }

        Ok(Identity::Service { name: name.to_string() })
    }

    async fn resolve_session(&self, presented_token: &str) -> Result<Identity, GatewayError> {
        let hash = sentinel_envelope::hash_session_token(presented_token);
        let session = self
            .repo
            .get_session_by_token_hash(&hash)
            .await?
            .ok_or(GatewayError::Unauthorized)?;

        let now = Utc::now();
        if session.is_expired(now) {
            return Err(GatewayError::Unauthorized);
        }

        if self.session_ttl_touch {
            touch_session_activity(Arc::clone(&self.repo), session.clone(), now);
        }

        let role = self.lookup_role(&session.user_id).await;
        Ok(Identity::User {
            id: session.user_id,
            role,
        })
    }

    /// Reads the role stored on the owning user's record. A lookup
    /// failure (backend error or a deleted user) degrades to no role
    /// rather than failing the whole request — the same best-effort
    /// posture as the activity-touch calls below.
    async fn lookup_role(&self, user_id: &UserId) -> Option<String> {
        match self.repo.get_user(user_id).await {
            Ok(Some(user)) => user.role,
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, %user_id, "role lookup failed, treating as no role");
                None
            }
        }
    }
}

fn touch_session_activity<R: SessionRepo + 'static>(
    repo: Arc<R>,
    session: Session,
    now: chrono::DateTime<Utc>,
) {
    tokio::spawn(async move {
        if let Err(e) = repo.touch_session_activity(&session.id, now).await {
            tracing::warn!(error = %e, session_id = %session.id, "best-effort session activity touch failed");
        }
    });
}

/// Verifies an ed25519 signature over the exact challenge bytes a
/// wallet was asked to sign. Used only by the dedicated challenge/verify
/// endpoints, never as ambient authentication.
pub fn verify_wallet_challenge(
    public_key: &VerifyingKey,
    challenge_bytes: &[u8],
    signature: &Signature,
) -> bool {
    public_key.verify(challenge_bytes, signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use ed25519_dalek::SigningKey;
    use rand_core::OsRng;
    use tokio::sync::RwLock;

    use crate::model::{ApiKey, ApiKeyId, SessionId, User};

    #[derive(Default)]
    struct MemAuthRepo {
        users: RwLock<HashMap<UserId, User>>,
        sessions: RwLock<HashMap<SessionId, Session>>,
        api_keys: RwLock<HashMap<ApiKeyId, ApiKey>>,
    }

    #[async_trait::async_trait]
    impl UserRepo for MemAuthRepo {
        async fn create_user(&self, _principal: &str) -> Result<User, crate::error::RepoError> {
            unimplemented!("not exercised by these tests")
        }
        async fn get_user_by_principal(&self, _principal: &str) -> Result<Option<User>, crate::error::RepoError> {
            unimplemented!("not exercised by these tests")
        }
        async fn get_user(&self, id: &UserId) -> Result<Option<User>, crate::error::RepoError> {
            Ok(self.users.read().await.get(id).cloned())
        }
        async fn update_user_nonce(&self, _id: &UserId, _nonce: &str) -> Result<(), crate::error::RepoError> {
            unimplemented!("not exercised by these tests")
        }
        async fn touch_user_last_seen(
            &self,
            _id: &UserId,
            _at: chrono::DateTime<Utc>,
        ) -> Result<(), crate::error::RepoError> {
            Ok(())
        }
        async fn set_user_role(&self, id: &UserId, role: Option<String>) -> Result<(), crate::error::RepoError> {
            let mut users = self.users.write().await;
            let user = users.get_mut(id).ok_or(crate::error::RepoError::NotFound)?;
            user.role = role;
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl SessionRepo for MemAuthRepo {
        async fn create_session(&self, session: Session) -> Result<Session, crate::error::RepoError> {
            self.sessions.write().await.insert(session.id.clone(), session.clone());
            Ok(session)
        }
        async fn get_session_by_token_hash(
            &self,
            token_hash: &[u8],
        ) -> Result<Option<Session>, crate::error::RepoError> {
            Ok(self
                .sessions
                .read()
                .await
                .values()
                .find(|s| s.token_hash == token_hash)
                .cloned())
        }
        async fn touch_session_activity(
            &self,
            _id: &SessionId,
            _at: chrono::DateTime<Utc>,
        ) -> Result<(), crate::error::RepoError> {
            Ok(())
        }
        async fn delete_session(&self, id: &SessionId) -> Result<(), crate::error::RepoError> {
            self.sessions.write().await.remove(id);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ApiKeyRepo for MemAuthRepo {
        async fn create_api_key(&self, key: ApiKey) -> Result<ApiKey, crate::error::RepoError> {
            self.api_keys.write().await.insert(key.id.clone(), key.clone());
            Ok(key)
        }
        async fn list_api_keys_by_user(&self, _user_id: &UserId) -> Result<Vec<ApiKey>, crate::error::RepoError> {
            unimplemented!("not exercised by these tests")
        }
        async fn get_api_key_by_hash(&self, token_hash: &[u8]) -> Result<Option<ApiKey>, crate::error::RepoError> {
            Ok(self.api_keys.read().await.values().find(|k| k.token_hash == token_hash).cloned())
        }
        async fn revoke_api_key(
            &self,
            _id: &ApiKeyId,
            _user_id: &UserId,
            _at: chrono::DateTime<Utc>,
        ) -> Result<(), crate::error::RepoError> {
            unimplemented!("not exercised by these tests")
        }
        async fn touch_api_key_last_used(
            &self,
            _id: &ApiKeyId,
            _at: chrono::DateTime<Utc>,
        ) -> Result<(), crate::error::RepoError> {
            Ok(())
        }
    }

    fn request_context(api_key: &str) -> RequestContext<'_> {
        RequestContext {
            service_token_header: None,
            api_key_header: Some(api_key),
            bearer_token: None,
            session_cookie: None,
            socket_ip: "127.0.0.1".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn api_key_identity_carries_the_owning_users_stored_role() {
        use std::collections::BTreeSet;

        let repo = Arc::new(MemAuthRepo::default());
        let now = Utc::now();
        repo.users.write().await.insert(
            "user-1".to_string(),
            User {
                id: "user-1".to_string(),
                principal: "0xabc".to_string(),
                role: Some("admin".to_string()),
                nonce: String::new(),
                last_seen_at: now,
            },
        );

        let plaintext = sentinel_envelope::generate_api_key().unwrap();
        let hash = sentinel_envelope::hash_api_key(&plaintext).to_vec();
        repo.api_keys.write().await.insert(
            "key-1".to_string(),
            ApiKey {
                id: "key-1".to_string(),
                user_id: "user-1".to_string(),
                name: "ci".to_string(),
                token_hash: hash,
                prefix: "sl_deadbeef".to_string(),
                scopes: BTreeSet::new(),
                created_at: now,
                last_used_at: None,
                revoked_at: None,
            },
        );

        let api_keys = Arc::new(ApiKeyManager::new(Arc::clone(&repo)));
        let authenticator = Authenticator::new(api_keys, Arc::clone(&repo), ServiceTokens::new(), vec![]);

        let identity = authenticator.resolve(&request_context(&plaintext)).await.unwrap();
        assert_eq!(
            identity,
            Identity::User {
                id: "user-1".to_string(),
                role: Some("admin".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn api_key_identity_has_no_role_when_the_user_has_none() {
        use std::collections::BTreeSet;

        let repo = Arc::new(MemAuthRepo::default());
        let now = Utc::now();
        repo.users.write().await.insert(
            "user-2".to_string(),
            User {
                id: "user-2".to_string(),
                principal: "0xdef".to_string(),
                role: None,
                nonce: String::new(),
                last_seen_at: now,
            },
        );

        let plaintext = sentinel_envelope::generate_api_key().unwrap();
        let hash = sentinel_envelope::hash_api_key(&plaintext).to_vec();
        repo.api_keys.write().await.insert(
            "key-2".to_string(),
            ApiKey {
                id: "key-2".to_string(),
                user_id: "user-2".to_string(),
                name: "ci".to_string(),
                token_hash: hash,
                prefix: "sl_cafef00d".to_string(),
                scopes: BTreeSet::new(),
                created_at: now,
                last_used_at: None,
                revoked_at: None,
            },
        );

        let api_keys = Arc::new(ApiKeyManager::new(Arc::clone(&repo)));
        let authenticator = Authenticator::new(api_keys, Arc::clone(&repo), ServiceTokens::new(), vec![]);

        let identity = authenticator.resolve(&request_context(&plaintext)).await.unwrap();
        assert_eq!(
            identity,
            Identity::User {
                id: "user-2".to_string(),
                role: None,
            }
        );
    }

    #[test]
    fn wallet_signature_over_correct_bytes_verifies() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        let challenge = b"nonce:deadbeef;ts:1234567890";
        let signature = {
            use ed25519_dalek::Signer;
            signing_key.sign(challenge)
        };
        assert!(verify_wallet_challenge(&verifying_key, challenge, &signature));
    }

    #[test]
    fn wallet_signature_over_wrong_bytes_fails() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        let signature = {
            use ed25519_dalek::Signer;
            signing_key.sign(b"original-challenge")
        };
        assert!(!verify_wallet_challenge(
            &verifying_key,
            b"tampered-challenge",
            &signature
        ));
    }
}
