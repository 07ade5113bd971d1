//! Auth and rate-limit middleware, composed via
//! `axum::middleware::from_fn_with_state`.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use sentinel_core::repo::Repository;
use sentinel_core::auth::RequestContext;

use crate::error_response::ErrorBody;
use crate::state::Shared;

pub async fn rate_limit_middleware<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if matches!(req.uri().path(), "/healthz" | "/metrics") {
        return next.run(req).await;
    }

    if !state.rate_limiter.check(addr.ip()).await {
        tracing::warn!(ip = %addr.ip(), path = %req.uri().path(), "rate limit exceeded");
        return (
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "1")],
            Json(ErrorBody {
                error: "rate limit exceeded".into(),
            }),
        )
            .into_response();
    }

    next.run(req).await
}

pub async fn auth_middleware<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut req: Request,
    next: Next,
) -> Response {
    let headers = req.headers().clone();
    let service_token_header = headers
        .get("x-service-token")
        .and_then(|v| v.to_str().ok());
    let api_key_header = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let bearer_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let session_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_session_cookie);

    let ctx = RequestContext {
        service_token_header,
        api_key_header,
        bearer_token,
        session_cookie: session_cookie.as_deref(),
        socket_ip: addr.ip(),
    };

    match state.authenticator.resolve(&ctx).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            req.extensions_mut().insert(ClientAddr(addr.ip()));
            next.run(req).await
        }
        Err(e) => crate::error_response::ApiError::from(e).into_response(),
    }
}

/// The authenticator's verified socket IP, inserted by [`auth_middleware`]
/// so downstream handlers never have to re-derive it from headers.
#[derive(Debug, Clone, Copy)]
pub struct ClientAddr(pub std::net::IpAddr);

fn extract_session_cookie(cookie_header: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "sentinel_session").then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_session_cookie_finds_named_cookie_among_others() {
        let header = "foo=bar; sentinel_session=abc123; other=1";
        assert_eq!(extract_session_cookie(header), Some("abc123".to_string()));
    }

    #[test]
    fn extract_session_cookie_absent_returns_none() {
        assert_eq!(extract_session_cookie("foo=bar"), None);
    }
}
