//! Admin HTTP server
//!
//! Runs beside the admission server with its own listener. Nothing here can
//! hold up the admission server's shutdown: errors are logged by the caller
//! and the listener stops on the shared token.

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use log::info;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::admin::handlers;
use crate::common::{Result, WebhookError};
use crate::registrar::WebhookRegistrar;

/// Serve `/health` and `/ready` on `addr` until `token` is cancelled
pub async fn start_admin_server(
    addr: SocketAddr,
    registrar: WebhookRegistrar,
    token: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| WebhookError::Transport(format!("failed to bind admin address {}: {}", addr, e)))?;
    serve_admin(listener, registrar, token).await
}

/// Like [`start_admin_server`] on an already bound listener
pub async fn serve_admin(
    listener: TcpListener,
    registrar: WebhookRegistrar,
    token: CancellationToken,
) -> Result<()> {
    if let Ok(local) = listener.local_addr() {
        info!("Admin server listening on {}", local);
    }

    axum::serve(listener, build_router(registrar))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .map_err(|e| WebhookError::Transport(format!("admin server: {}", e)))?;

    info!("Admin server stopped");
    Ok(())
}

/// Build the admin router
pub fn build_router(registrar: WebhookRegistrar) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness))
        .with_state(registrar)
        .layer(TraceLayer::new_for_http())
}
