//! The admission route
//!
//! Every request gets HTTP 200 and an `AdmissionReview` body. Bodies that
//! cannot be decoded are answered with an invalid-request review rather than
//! an HTTP error, so the API server always sees a well-formed reply.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::any;
use axum::{Json, Router};
use bytes::Bytes;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::DynamicObject;
use log::warn;

use super::handler::AdmissionHandler;

/// Router with the single admission route `/`, any method
///
/// Bodies are read whole whatever their size; the API server already bounds
/// object size.
pub fn router(handler: Arc<dyn AdmissionHandler>) -> Router {
    Router::new()
        .route("/", any(review))
        .layer(DefaultBodyLimit::disable())
        .with_state(handler)
}

async fn review(
    State(handler): State<Arc<dyn AdmissionHandler>>,
    body: Bytes,
) -> Json<AdmissionReview<DynamicObject>> {
    Json(admit_body(handler.as_ref(), &body).await)
}

/// Decode `body` and run it through `handler`
pub async fn admit_body(handler: &dyn AdmissionHandler, body: &[u8]) -> AdmissionReview<DynamicObject> {
    if body.is_empty() {
        warn!("Received admission request with an empty body");
        return AdmissionResponse::invalid("empty admission review body").into_review();
    }

    let review: AdmissionReview<DynamicObject> = match serde_json::from_slice(body) {
        Ok(review) => review,
        Err(e) => {
            warn!("Failed to decode admission review: {}", e);
            return AdmissionResponse::invalid(format!("failed to decode admission review: {}", e))
                .into_review();
        }
    };

    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            warn!("Invalid admission review: {}", e);
            return AdmissionResponse::invalid(format!("invalid admission review: {}", e))
                .into_review();
        }
    };

    handler.admit(&request).await.into_review()
}
