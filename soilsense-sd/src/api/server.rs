//! HTTP server setup and routing
//!
//! Sets up the Axum router for channel access, session status, and SSE.

use crate::service::SessionStatus;
use axum::{
    routing::{get, post},
    Router,
};
use soilsense_common::bus::MessageBus;
use soilsense_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Shared application context passed to all handlers
///
/// **Note:** AppContext implements Clone, which gives us `FromRef<AppContext>`
/// for free via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    /// Wire-level message bus (the sensor channel)
    pub bus: Arc<MessageBus>,
    /// Session monitor event bus
    pub events: Arc<EventBus>,
    /// Session status snapshot, written by the service loop
    pub status: Arc<RwLock<SessionStatus>>,
}

/// Build the daemon router with all routes
///
/// Topic names contain `/`, so the channel routes use trailing wildcards:
/// `POST /publish/sensor/state` publishes onto the `sensor/state` topic.
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))

        // Session status snapshot
        .route("/session", get(super::handlers::get_session))

        // Channel adapter: publish into the bus, subscribe as SSE
        .route("/publish/*topic", post(super::handlers::publish_message))
        .route("/subscribe/*topic", get(super::sse::topic_stream))

        // Monitor event stream
        .route("/events", get(super::sse::event_stream))

        // Attach application context
        .with_state(ctx)

        // Enable CORS for local dashboards
        .layer(CorsLayer::permissive())
}
