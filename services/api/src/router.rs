//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application: the
//! telephony voice webhook, the per-call media stream WebSocket endpoint,
//! and a health probe.

use crate::{call::call_handler, handlers, state::AppState};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/voice", post(handlers::voice_webhook))
        .route("/call/{call_sid}", get(call_handler))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
