//! `ANY /api/v1/{service}/{*rest}` — the identity-aware reverse proxy.
//! Resolves the route, strips forgeable headers, overwrites identity
//! headers, streams the body through `reqwest`, and forwards the
//! upstream response (including 5xx) verbatim.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Extension;

use sentinel_core::proxy::{is_always_stripped, IdentityHeaders};
use sentinel_core::repo::Repository;
use sentinel_core::{GatewayError, Identity};

use crate::error_response::ApiError;
use crate::middleware::ClientAddr;
use crate::state::Shared;

pub async fn proxy<R: Repository + 'static>(
    State(state): State<Shared<R>>,
    Extension(identity): Extension<Identity>,
    Extension(client): Extension<ClientAddr>,
    Path((service, rest)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let (upstream_base, timeout) = state
        .route_table
        .resolve(&service)
        .ok_or_else(|| GatewayError::NotFound(format!("service '{service}'")))?;

    let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();
    let upstream_url = format!("{upstream_base}/{rest}{query}");

    let reqwest_method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|_| GatewayError::InvalidInput("unsupported method".into()))?;

    let mut outbound = state
        .http_client
        .request(reqwest_method, &upstream_url)
        .timeout(timeout);

    for (name, value) in headers.iter() {
        if is_always_stripped(name.as_str()) || is_identity_header(name.as_str()) {
            continue;
        }
        if let Ok(value_str) = value.to_str() {
            outbound = outbound.header(name.as_str(), value_str);
        }
    }

    let identity_headers = IdentityHeaders::build(&identity, client.0);
    outbound = outbound
        .header("x-user-id", identity_headers.user_id)
        .header("x-user-role", identity_headers.user_role)
        .header("x-forwarded-for", identity_headers.forwarded_for)
        .header("x-real-ip", identity_headers.real_ip);

    outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));

    let upstream_response = match outbound.send().await {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => return Err(GatewayError::UpstreamTimeout.into()),
        Err(e) => {
            tracing::warn!(error = %e, service = %service, "upstream request failed");
            return Err(GatewayError::BackendFailure.into());
        }
    };

    Ok(translate_response(upstream_response).await)
}

/// `X-User-ID`, `X-User-Role`, `X-Forwarded-For`, `X-Real-IP` are always
/// overwritten with the authenticator's values, never passed through —
/// dropped here from the inbound copy so the later explicit `.header()`
/// calls are a true overwrite rather than a second, appended header that
/// an upstream parser might read first.
fn is_identity_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "x-user-id" | "x-user-role" | "x-forwarded-for" | "x-real-ip"
    )
}

async fn translate_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if is_always_stripped(name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_bytes()),
        ) {
            response_headers.insert(name, value);
        }
    }

    let body = Body::from_stream(upstream.bytes_stream());
    let axum_status = axum::http::StatusCode::from_u16(status.as_u16())
        .unwrap_or(axum::http::StatusCode::BAD_GATEWAY);
    (axum_status, response_headers, body).into_response()
}
