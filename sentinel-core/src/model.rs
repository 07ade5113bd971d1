//! Domain entities. Defined by semantics, not storage layout — every type
//! here is what the core reasons about; a repository adapter is free to
//! lay these out however its backing store prefers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type SecretId = String;
pub type SessionId = String;
pub type ApiKeyId = String;

/// A stable principal, created on first successful challenge-response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Wallet-style public identifier the user authenticates as.
    pub principal: String,
    pub role: Option<String>,
    /// Short-lived nonce used for the next signature challenge.
    pub nonce: String,
    pub last_seen_at: DateTime<Utc>,
}

/// A bearer token issued after a successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    /// Never the plaintext token — only its hash is ever stored.
    pub token_hash: Vec<u8>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub client_ip: String,
    pub user_agent: String,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A long-lived bearer credential bound to a tenant and scope set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub user_id: UserId,
    pub name: String,
    pub token_hash: Vec<u8>,
    /// Non-secret display prefix, e.g. `sl_a1b2c3d4`.
    pub prefix: String,
    pub scopes: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// The AEAD algorithm identifier recorded alongside a secret so future
/// rotations are unambiguous.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlgorithmTag {
    Aes256GcmV1,
}

/// A user-owned named encrypted blob. The core never persists plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Secret {
    pub id: SecretId,
    pub user_id: UserId,
    pub name: String,
    pub ciphertext: Vec<u8>,
    pub wrapped_data_key: Vec<u8>,
    pub iv: Vec<u8>,
    pub algorithm_tag: AlgorithmTag,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata-only view of a [`Secret`], returned from list/upsert/delete —
/// never carries ciphertext or plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretMetadata {
    pub id: SecretId,
    pub user_id: UserId,
    pub name: String,
    pub algorithm_tag: AlgorithmTag,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Secret> for SecretMetadata {
    fn from(s: &Secret) -> Self {
        Self {
            id: s.id.clone(),
            user_id: s.user_id.clone(),
            name: s.name.clone(),
            algorithm_tag: s.algorithm_tag,
            version: s.version,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// `(secret_id, service_name)` authorization relation. An empty set on a
/// secret means "owner only".
pub type SecretPermissions = BTreeSet<String>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Read,
    Delete,
    DecryptFail,
    PermissionChange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// Append-only audit record. Never mutated; readable only by the owning
/// user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: String,
    pub user_id: UserId,
    pub secret_id: Option<SecretId>,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
    pub outcome: AuditOutcome,
}

/// Client-observed context attached to a mutation for audit purposes.
#[derive(Debug, Clone)]
pub struct AuditMeta {
    pub ip: String,
    pub user_agent: String,
}
