//! HTTP request handlers
//!
//! Implements the REST endpoints for channel publishing and status.

use crate::api::server::AppContext;
use crate::service::SessionStatus;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use soilsense_common::bus::WireMessage;
use tracing::debug;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    status: String,
    topic: String,
    /// Bus subscribers at publication time (includes the session service)
    subscribers: usize,
}

// ============================================================================
// Endpoints
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "soilsense-sd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /session - Session status snapshot
pub async fn get_session(State(ctx): State<AppContext>) -> Json<SessionStatus> {
    Json(ctx.status.read().await.clone())
}

/// POST /publish/{topic} - Publish a raw payload onto the channel
///
/// The body is forwarded byte-for-byte as the message payload. Publishing
/// is best-effort by channel contract, so this always acknowledges; the
/// subscriber count tells callers whether anyone was listening.
pub async fn publish_message(
    State(ctx): State<AppContext>,
    Path(topic): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<PublishResponse>) {
    debug!("HTTP publish to {:?} ({} bytes)", topic, body.len());

    let subscribers = ctx.bus.subscriber_count();
    ctx.bus
        .publish(WireMessage::new(topic.as_str(), body.to_vec()));

    (
        StatusCode::ACCEPTED,
        Json(PublishResponse {
            status: "accepted".to_string(),
            topic,
            subscribers,
        }),
    )
}
