//! `GET/POST /apikeys`, `DELETE /apikeys/{id}` — wraps
//! [`sentinel_core::ApiKeyManager`] for an authenticated user identity.

use std::collections::BTreeSet;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use sentinel_core::repo::Repository;
use sentinel_core::{GatewayError, Identity};

use crate::error_response::ApiError;
use crate::state::Shared;

#[derive(Serialize)]
pub struct ApiKeySummary {
    pub id: String,
    pub name: String,
    pub prefix: String,
    pub scopes: BTreeSet<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub revoked: bool,
}

impl From<sentinel_core::model::ApiKey> for ApiKeySummary {
    fn from(k: sentinel_core::model::ApiKey) -> Self {
        Self {
            id: k.id,
            name: k.name,
            prefix: k.prefix,
            scopes: k.scopes,
            created_at: k.created_at,
            last_used_at: k.last_used_at,
            revoked: k.revoked_at.is_some(),
        }
    }
}

#[derive(Deserialize)]
pub struct IssueRequest {
    pub name: String,
    #[serde(default)]
    pub scopes: BTreeSet<String>,
}

#[derive(Serialize)]
pub struct IssueResponse {
    pub id: String,
    pub name: String,
    pub key: String,
    pub prefix: String,
    pub scopes: BTreeSet<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn require_user(identity: &Identity) -> Result<&str, ApiError> {
    match identity {
        Identity::User { id, .. } => Ok(id.as_str()),
        _ => Err(GatewayError::Forbidden.into()),
    }
}

pub async fn list<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<ApiKeySummary>>, ApiError> {
    let user_id = require_user(&identity)?.to_string();
    let keys = state.api_keys.list(&user_id).await?;
    Ok(Json(keys.into_iter().map(ApiKeySummary::from).collect()))
}

pub async fn issue<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<IssueRequest>,
) -> Result<(axum::http::StatusCode, Json<IssueResponse>), ApiError> {
    let user_id = require_user(&identity)?.to_string();
    let issued = state.api_keys.issue(&user_id, &req.name, req.scopes).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(IssueResponse {
            id: issued.id,
            name: issued.name,
            key: issued.key,
            prefix: issued.prefix,
            scopes: issued.scopes,
            created_at: issued.created_at,
        }),
    ))
}

pub async fn revoke<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    let user_id = require_user(&identity)?.to_string();
    state.api_keys.revoke(&user_id, &id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
