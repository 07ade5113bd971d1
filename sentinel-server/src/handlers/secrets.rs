//! `GET/PUT/DELETE /secrets/{name}`, permission management, and audit
//! listing — wraps [`sentinel_core::SecretsManager`].

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use sentinel_core::model::{AuditEntry, AuditMeta, SecretMetadata, SecretPermissions};
use sentinel_core::repo::Repository;
use sentinel_core::{GatewayError, Identity};

use crate::error_response::ApiError;
use crate::middleware::ClientAddr;
use crate::state::Shared;

fn require_user(identity: &Identity) -> Result<&str, ApiError> {
    match identity {
        Identity::User { id, .. } => Ok(id.as_str()),
        _ => Err(GatewayError::Forbidden.into()),
    }
}

fn audit_meta(client: &ClientAddr, headers: &HeaderMap) -> AuditMeta {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    AuditMeta {
        ip: client.0.to_string(),
        user_agent,
    }
}

#[derive(Deserialize)]
pub struct UpsertRequest {
    pub name: String,
    pub value: String,
}

#[derive(Serialize)]
pub struct UpsertResponse {
    pub id: String,
    pub name: String,
    pub created: bool,
    pub metadata: SecretMetadata,
}

#[derive(Serialize)]
pub struct SecretResponse {
    pub value: String,
}

#[derive(Deserialize)]
pub struct GetQuery {
    /// Required when the caller authenticates as an internal service
    /// (`Identity::Service`, via `X-Service-Token`): the owning user whose
    /// secret is being fetched on its behalf. Ignored for a `User` caller,
    /// who can only ever fetch their own secret.
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

pub async fn list<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<SecretMetadata>>, ApiError> {
    let user_id = require_user(&identity)?.to_string();
    Ok(Json(state.secrets.list(&user_id).await?))
}

pub async fn upsert<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Extension(client): Extension<ClientAddr>,
    headers: HeaderMap,
    Json(req): Json<UpsertRequest>,
) -> Result<(axum::http::StatusCode, Json<UpsertResponse>), ApiError> {
    let user_id = require_user(&identity)?.to_string();
    let meta = audit_meta(&client, &headers);
    let result = state
        .secrets
        .upsert(state.master_key(), &user_id, &req.name, req.value.as_bytes(), meta)
        .await?;
    let status = if result.created {
        axum::http::StatusCode::CREATED
    } else {
        axum::http::StatusCode::OK
    };
    Ok((
        status,
        Json(UpsertResponse {
            id: result.metadata.id.clone(),
            name: result.metadata.name.clone(),
            created: result.created,
            metadata: result.metadata,
        }),
    ))
}

pub async fn get<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Extension(client): Extension<ClientAddr>,
    Path(name): Path<String>,
    Query(query): Query<GetQuery>,
    headers: HeaderMap,
) -> Result<Json<SecretResponse>, ApiError> {
    // `requesting_service` is always derived from the authenticated
    // identity, never from the query string — a `User` caller can only
    // ever read their own secret, so the allowlist check never applies
    // to them; a `Service` caller names itself via `X-Service-Token` and
    // must say whose secret it wants via `user_id`.
    let (user_id, requesting_service) = match &identity {
        Identity::User { id, .. } => (id.clone(), None),
        Identity::Service { name: svc } => {
            let target = query.user_id.clone().ok_or_else(|| {
                GatewayError::InvalidInput("user_id is required for a service-initiated secret fetch".into())
            })?;
            (target, Some(svc.clone()))
        }
        Identity::Anonymous => return Err(GatewayError::Unauthorized.into()),
    };

    let meta = audit_meta(&client, &headers);
    let plaintext = state
        .secrets
        .get(
            state.master_key(),
            &user_id,
            &name,
            requesting_service.as_deref(),
            meta,
        )
        .await?;
    let value = String::from_utf8(plaintext).map_err(|_| GatewayError::CryptoFailure)?;
    Ok(Json(SecretResponse { value }))
}

pub async fn delete<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Extension(client): Extension<ClientAddr>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<axum::http::StatusCode, ApiError> {
    let user_id = require_user(&identity)?.to_string();
    let meta = audit_meta(&client, &headers);
    state.secrets.delete(&user_id, &name, meta).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn get_permissions<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Result<Json<SecretPermissions>, ApiError> {
    let user_id = require_user(&identity)?.to_string();
    Ok(Json(state.secrets.get_permissions(&user_id, &name).await?))
}

pub async fn set_permissions<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Extension(client): Extension<ClientAddr>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(services): Json<SecretPermissions>,
) -> Result<axum::http::StatusCode, ApiError> {
    let user_id = require_user(&identity)?.to_string();
    let meta = audit_meta(&client, &headers);
    state
        .secrets
        .set_permissions(&user_id, &name, services, meta)
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn list_audit<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let user_id = require_user(&identity)?.to_string();
    Ok(Json(state.secrets.list_audit_by_user(&user_id, query.limit).await?))
}

pub async fn list_audit_for_secret<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let user_id = require_user(&identity)?.to_string();
    Ok(Json(
        state
            .secrets
            .list_audit_by_secret(&user_id, &name, query.limit)
            .await?,
    ))
}
