//! `/auth/challenge`, `/auth/verify`, `DELETE /auth/session` — the
//! wallet-signature challenge flow. Used only by these dedicated
//! endpoints, never as ambient authentication (§4.6).

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{Duration as ChronoDuration, Utc};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

use sentinel_core::model::Session;
use sentinel_core::repo::{Repository, SessionRepo, UserRepo};
use sentinel_core::{auth::verify_wallet_challenge, GatewayError};

use crate::error_response::ApiError;
use crate::middleware::ClientAddr;
use crate::state::Shared;

const SESSION_COOKIE_NAME: &str = "sentinel_session";
const SESSION_TTL_HOURS: i64 = 24;
const NONCE_BYTES: usize = 32;

#[derive(Deserialize)]
pub struct ChallengeRequest {
    /// Hex-encoded ed25519 public key identifying the wallet.
    pub principal: String,
}

#[derive(Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub principal: String,
    /// Hex-encoded 64-byte ed25519 signature over the challenge string
    /// returned from `/auth/challenge`.
    pub signature: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub session_token: String,
    pub user_id: String,
}

pub async fn challenge<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    if req.principal.trim().is_empty() {
        return Err(GatewayError::InvalidInput("principal must not be empty".into()).into());
    }

    let mut nonce_bytes = [0u8; NONCE_BYTES];
    getrandom::getrandom(&mut nonce_bytes).map_err(|_| ApiError(GatewayError::CryptoFailure))?;
    let nonce = hex::encode(nonce_bytes);
    let challenge = format!("{nonce}|{}", Utc::now().timestamp());

    let existing = state.repo.get_user_by_principal(&req.principal).await?;
    match existing {
        Some(user) => state.repo.update_user_nonce(&user.id, &challenge).await?,
        None => {
            let user = state.repo.create_user(&req.principal).await?;
            state.repo.update_user_nonce(&user.id, &challenge).await?;
            if let Some(role) = state.role_assignments.get(&req.principal) {
                state.repo.set_user_role(&user.id, Some(role.clone())).await?;
            }
        }
    }

    Ok(Json(ChallengeResponse { challenge }))
}

pub async fn verify<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(client): Extension<ClientAddr>,
    Json(req): Json<VerifyRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .repo
        .get_user_by_principal(&req.principal)
        .await?
        .ok_or(GatewayError::Unauthorized)?;

    if user.nonce.is_empty() {
        return Err(GatewayError::Unauthorized.into());
    }

    let public_key_bytes = hex::decode(&req.principal).map_err(|_| GatewayError::Unauthorized)?;
    let public_key_array: [u8; 32] =
        public_key_bytes.as_slice().try_into().map_err(|_| GatewayError::Unauthorized)?;
    let verifying_key =
        VerifyingKey::from_bytes(&public_key_array).map_err(|_| GatewayError::Unauthorized)?;

    let signature_bytes = hex::decode(&req.signature).map_err(|_| GatewayError::Unauthorized)?;
    let signature_array: [u8; 64] =
        signature_bytes.as_slice().try_into().map_err(|_| GatewayError::Unauthorized)?;
    let signature = Signature::from_bytes(&signature_array);

    if !verify_wallet_challenge(&verifying_key, user.nonce.as_bytes(), &signature) {
        return Err(GatewayError::Unauthorized.into());
    }

    let mut next_nonce = [0u8; NONCE_BYTES];
    getrandom::getrandom(&mut next_nonce).map_err(|_| ApiError(GatewayError::CryptoFailure))?;
    state
        .repo
        .update_user_nonce(&user.id, &hex::encode(next_nonce))
        .await?;

    let plaintext_token = sentinel_envelope::generate_session_token()
        .map_err(|_| ApiError(GatewayError::CryptoFailure))?;
    let now = Utc::now();
    let session = Session {
        id: format!("session_{}", hex::encode(&next_nonce[..8])),
        user_id: user.id.clone(),
        token_hash: sentinel_envelope::hash_session_token(&plaintext_token).to_vec(),
        issued_at: now,
        expires_at: now + ChronoDuration::hours(SESSION_TTL_HOURS),
        last_active_at: now,
        client_ip: client.0.to_string(),
        user_agent: String::new(),
    };
    state.repo.create_session(session).await?;

    let secure = if state.strict_mode { "; Secure" } else { "" };
    let cookie = format!(
        "{SESSION_COOKIE_NAME}={plaintext_token}; HttpOnly; SameSite=Strict; Path=/{secure}"
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(VerifyResponse {
            session_token: plaintext_token,
            user_id: user.id,
        }),
    )
        .into_response())
}

pub async fn logout<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    headers: axum::http::HeaderMap,
) -> Result<Response, ApiError> {
    let token = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            raw.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == SESSION_COOKIE_NAME).then(|| value.to_string())
            })
        });

    if let Some(token) = token {
        let hash = sentinel_envelope::hash_session_token(&token);
        if let Some(session) = state.repo.get_session_by_token_hash(&hash).await? {
            state.repo.delete_session(&session.id).await?;
        }
    }

    let expired_cookie = format!("{SESSION_COOKIE_NAME}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0");
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, expired_cookie)]).into_response())
}
