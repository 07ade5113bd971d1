//! The sentinel gateway's HTTP surface as a library: router assembly,
//! configuration loading, and shared state, split out of the `main`
//! binary so integration tests can exercise the router with
//! `tower::ServiceExt::oneshot` the way `narayana_server`'s HTTP layer is
//! tested in the retrieval pack, without a live socket.

pub mod config;
pub mod error_response;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod state;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use sentinel_core::repo::Repository;

pub use state::{AppState, Shared};

/// Assemble the full router over a constructed [`AppState`]: every
/// endpoint family in the HTTP surface, the auth/rate-limit middleware
/// pair (auth innermost, rate limit outermost), tracing, panic-catching,
/// and the request body size limit — everything `main` needs beyond
/// binding a listener.
pub fn build_router<R: Repository + 'static>(state: Shared<R>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/auth/challenge", post(handlers::auth::challenge))
        .route("/auth/verify", post(handlers::auth::verify))
        .route("/auth/session", delete(handlers::auth::logout))
        .route("/apikeys", get(handlers::apikeys::list).post(handlers::apikeys::issue))
        .route("/apikeys/:id", delete(handlers::apikeys::revoke))
        .route("/secrets", get(handlers::secrets::list).put(handlers::secrets::upsert))
        .route("/secrets/audit", get(handlers::secrets::list_audit))
        .route(
            "/secrets/:name",
            get(handlers::secrets::get).delete(handlers::secrets::delete),
        )
        .route(
            "/secrets/:name/permissions",
            get(handlers::secrets::get_permissions).put(handlers::secrets::set_permissions),
        )
        .route("/secrets/:name/audit", get(handlers::secrets::list_audit_for_secret))
        .route("/api/v1/:service/*rest", axum::routing::any(handlers::proxy::proxy))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::auth_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(RequestBodyLimitLayer::new(config::MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
