//! `GET /metrics` — a small Prometheus-text-format endpoint, unauthenticated
//! and exempt from rate limiting (see `middleware::rate_limit_middleware`).
//! Not business logic the Non-goals exclude; the teacher ships an analogous
//! `/api/metrics` surface.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use sentinel_core::repo::Repository;

use crate::state::Shared;

pub async fn metrics<R: Repository + 'static>(State(state): State<Shared<R>>) -> Response {
    let tracked_ips = state.rate_limiter.tracked_buckets().await;

    let body = format!(
        "# HELP sentinel_rate_limit_tracked_ips Distinct source IPs with an active rate-limit bucket.\n\
         # TYPE sentinel_rate_limit_tracked_ips gauge\n\
         sentinel_rate_limit_tracked_ips {tracked_ips}\n"
    );

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}
