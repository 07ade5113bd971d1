//! CRUD over envelope-encrypted secrets, with per-service allowlists and
//! an audit trail on every access.

use std::sync::Arc;

use chrono::Utc;

use crate::error::GatewayError;
use crate::model::{
    AlgorithmTag, AuditAction, AuditEntry, AuditMeta, AuditOutcome, Secret, SecretMetadata,
    SecretPermissions, UserId,
};
use crate::repo::{AuditRepo, SecretRepo};

pub const AUDIT_PAGE_DEFAULT: usize = 100;
pub const AUDIT_PAGE_MAX: usize = 1000;
pub const AUDIT_PAGE_MIN: usize = 1;

pub struct UpsertResult {
    pub metadata: SecretMetadata,
    pub created: bool,
}

pub struct SecretsManager<R: SecretRepo + AuditRepo> {
    repo: Arc<R>,
}

impl<R: SecretRepo + AuditRepo> SecretsManager<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn upsert(
        &self,
        master_key: &[u8; sentinel_envelope::KEY_LEN],
        user_id: &UserId,
        name: &str,
        plaintext: &[u8],
        audit_meta: AuditMeta,
    ) -> Result<UpsertResult, GatewayError> {
        validate_name(name)?;

        let existing = self.repo.get_secret(user_id, name).await?;
        let (version, secret_id) = match &existing {
            Some(s) => (s.version + 1, s.id.clone()),
            None => (1, format!("secret_{}", secret_id_seed(user_id, name))),
        };

        let data_key = sentinel_envelope::generate_data_key()?;
        let iv = sentinel_envelope::generate_iv()?;
        let aad = sentinel_envelope::aad::build_secret_aad(user_id, name, version);
        let ciphertext = sentinel_envelope::aead_seal(&data_key, &iv, plaintext, &aad)?;
        let wrapped_data_key = sentinel_envelope::wrap(master_key, &data_key)?;
        let now = Utc::now();

        let record = Secret {
            id: secret_id,
            user_id: user_id.clone(),
            name: name.to_string(),
            ciphertext,
            wrapped_data_key,
            iv: iv.to_vec(),
            algorithm_tag: AlgorithmTag::Aes256GcmV1,
            version,
            created_at: existing.as_ref().map(|s| s.created_at).unwrap_or(now),
            updated_at: now,
        };

        let created = existing.is_none();
        let stored = if created {
            self.repo.create_secret(record).await?
        } else {
            self.repo.update_secret(record).await?
        };

        self.append_audit(
            user_id,
            Some(&stored.id),
            if created {
                AuditAction::Create
            } else {
                AuditAction::Update
            },
            AuditOutcome::Success,
            &audit_meta,
        )
        .await?;

        Ok(UpsertResult {
            metadata: SecretMetadata::from(&stored),
            created,
        })
    }

    pub async fn get(
        &self,
        master_key: &[u8; sentinel_envelope::KEY_LEN],
        user_id: &UserId,
        name: &str,
        requesting_service: Option<&str>,
        audit_meta: AuditMeta,
    ) -> Result<Vec<u8>, GatewayError> {
        let secret = self
            .repo
            .get_secret(user_id, name)
            .await?
            .ok_or_else(|| GatewayError::NotFound("secret".into()))?;

        if let Some(service) = requesting_service.filter(|s| !s.is_empty()) {
            let allowed = self.repo.get_secret_permissions(&secret.id).await?;
            if !allowed.contains(service) {
                return Err(GatewayError::Forbidden);
            }
        }

        let aad = sentinel_envelope::aad::build_secret_aad(user_id, name, secret.version);
        let iv: [u8; sentinel_envelope::IV_LEN] =
            secret.iv.as_slice().try_into().map_err(|_| GatewayError::CryptoFailure)?;

        let opened = (|| -> Result<Vec<u8>, sentinel_envelope::CryptoError> {
            let data_key = sentinel_envelope::unwrap(master_key, &secret.wrapped_data_key)?;
            sentinel_envelope::aead_open(&data_key, &iv, &secret.ciphertext, &aad)
        })();

        match opened {
            Ok(plaintext) => {
                self.append_audit(
                    user_id,
                    Some(&secret.id),
                    AuditAction::Read,
                    AuditOutcome::Success,
                    &audit_meta,
                )
                .await?;
                Ok(plaintext)
            }
            Err(_) => {
                // Never surface whether this was a tampered tag or a wrong key.
                self.append_audit(
                    user_id,
                    Some(&secret.id),
                    AuditAction::DecryptFail,
                    AuditOutcome::Failure,
                    &audit_meta,
                )
                .await?;
                Err(GatewayError::CryptoFailure)
            }
        }
    }

    pub async fn list(&self, user_id: &UserId) -> Result<Vec<SecretMetadata>, GatewayError> {
        let secrets = self.repo.list_secrets_by_user(user_id).await?;
        Ok(secrets.iter().map(SecretMetadata::from).collect())
    }

    pub async fn delete(
        &self,
        user_id: &UserId,
        name: &str,
        audit_meta: AuditMeta,
    ) -> Result<(), GatewayError> {
        let secret = self
            .repo
            .get_secret(user_id, name)
            .await?
            .ok_or_else(|| GatewayError::NotFound("secret".into()))?;
        self.repo.delete_secret(user_id, name).await?;
        self.append_audit(
            user_id,
            Some(&secret.id),
            AuditAction::Delete,
            AuditOutcome::Success,
            &audit_meta,
        )
        .await?;
        Ok(())
    }

    pub async fn get_permissions(
        &self,
        user_id: &UserId,
        name: &str,
    ) -> Result<SecretPermissions, GatewayError> {
        let secret = self
            .repo
            .get_secret(user_id, name)
            .await?
            .ok_or_else(|| GatewayError::NotFound("secret".into()))?;
        Ok(self.repo.get_secret_permissions(&secret.id).await?)
    }

    pub async fn set_permissions(
        &self,
        user_id: &UserId,
        name: &str,
        services: SecretPermissions,
        audit_meta: AuditMeta,
    ) -> Result<(), GatewayError> {
        let secret = self
            .repo
            .get_secret(user_id, name)
            .await?
            .ok_or_else(|| GatewayError::NotFound("secret".into()))?;
        self.repo
            .set_secret_permissions(&secret.id, services)
            .await?;
        self.append_audit(
            user_id,
            Some(&secret.id),
            AuditAction::PermissionChange,
            AuditOutcome::Success,
            &audit_meta,
        )
        .await?;
        Ok(())
    }

    pub async fn list_audit_by_user(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEntry>, GatewayError> {
        let limit = clamp_audit_limit(limit);
        Ok(self.repo.list_audit_by_user(user_id, limit).await?)
    }

    pub async fn list_audit_by_secret(
        &self,
        user_id: &UserId,
        name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEntry>, GatewayError> {
        let secret = self
            .repo
            .get_secret(user_id, name)
            .await?
            .ok_or_else(|| GatewayError::NotFound("secret".into()))?;
        let limit = clamp_audit_limit(limit);
        Ok(self.repo.list_audit_by_secret(&secret.id, limit).await?)
    }

    async fn append_audit(
        &self,
        user_id: &UserId,
        secret_id: Option<&str>,
        action: AuditAction,
        outcome: AuditOutcome,
        meta: &AuditMeta,
    ) -> Result<(), GatewayError> {
        let entry = AuditEntry {
            id: format!("audit_{}", secret_id_seed(user_id, &format!("{action:?}{}", Utc::now()))),
            user_id: user_id.clone(),
            secret_id: secret_id.map(String::from),
            action,
            timestamp: Utc::now(),
            ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            outcome,
        };
        self.repo.append_audit(entry).await?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), GatewayError> {
    if name.is_empty() || name.len() > 256 {
        return Err(GatewayError::InvalidInput(
            "secret name must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

fn clamp_audit_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(AUDIT_PAGE_DEFAULT)
        .clamp(AUDIT_PAGE_MIN, AUDIT_PAGE_MAX)
}

fn secret_id_seed(user_id: &str, name: &str) -> String {
    let digest = sentinel_envelope::hash_session_token(&format!("{user_id}|{name}"));
    hex::encode(&digest[..16])
}
