//! Admin request handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::Utc;
use log::warn;

use crate::registrar::WebhookRegistrar;

/// Liveness: the process is up
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Readiness: the webhook configuration is registered
pub async fn readiness(State(registrar): State<WebhookRegistrar>) -> impl IntoResponse {
    let (status, body) = match registrar.is_registered().await {
        Ok(true) => (StatusCode::OK, serde_json::json!({ "status": "ready" })),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "not ready",
                "reason": format!("{} is not registered", registrar.spec().config_name),
            }),
        ),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "status": "not ready", "reason": e.to_string() }),
            )
        }
    };

    (status, Json(body))
}
