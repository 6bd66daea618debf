//! Router and shared state.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::endpoints::AuthorizationServer;

/// Largest accepted request body. Token and revocation forms are tiny.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Shared state for HTTP handlers.
#[derive(Debug)]
pub struct HttpState {
    pub server: AuthorizationServer,
}

/// Create the HTTP router.
///
/// At most `Config::max_in_flight` requests are served at once. The permits
/// are shared by all routes; further callers queue.
pub fn create_router(server: AuthorizationServer) -> Router {
    let in_flight = GlobalConcurrencyLimitLayer::new(server.config().max_in_flight);
    let state = Arc::new(HttpState { server });

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/authorize", get(handlers::handle_authorize))
        .route("/token", post(handlers::handle_token))
        .route("/revoke", post(handlers::handle_revoke))
        .route(
            "/.well-known/oauth-authorization-server",
            get(handlers::handle_auth_server_metadata),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(in_flight)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "authz-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness_check(State(state): State<Arc<HttpState>>) -> Response {
    let store = state.server.store();
    let counts = async {
        Ok::<_, crate::error::StoreError>((
            store.codes().len().await?,
            store.access_tokens().len().await?,
            store.refresh_tokens().len().await?,
        ))
    };

    match state.server.bounded(counts).await {
        Ok((codes, access_tokens, refresh_tokens)) => Json(serde_json::json!({
            "status": "ready",
            "service": "authz-server",
            "version": env!("CARGO_PKG_VERSION"),
            "clients": state.server.registry().len(),
            "codes": codes,
            "access_tokens": access_tokens,
            "refresh_tokens": refresh_tokens
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "service": "authz-server",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
                .into_response()
        }
    }
}
