//! HTTP binding for the authorization server.
//!
//! - `transport`: router, shared state, health and readiness
//! - `handlers`: `/authorize`, `/token`, `/revoke` and RFC 8414 metadata
//! - `middleware`: bearer token guard for resource servers

pub mod handlers;
pub mod middleware;
pub mod transport;

use std::net::SocketAddr;

use crate::endpoints::AuthorizationServer;

pub use middleware::bearer_auth;
pub use transport::{HttpState, create_router};

/// Serve the authorization server over HTTP until Ctrl-C.
///
/// Starts the background sweeper when one is configured.
///
/// # Errors
///
/// Returns error if the port cannot be bound or the server fails.
pub async fn serve(server: AuthorizationServer, port: u16) -> anyhow::Result<()> {
    tracing::info!(
        issuer = %server.config().issuer,
        "Starting authorization server on port {}",
        port
    );
    tracing::info!("Registered {} clients", server.registry().len());

    let sweeper = server.start_sweeper();
    let router = create_router(server);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    tracing::info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
