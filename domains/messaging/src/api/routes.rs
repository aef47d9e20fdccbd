//! Route definitions for Messaging domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{messages, socket};
use super::middleware::MessagingState;

/// Realtime socket route
fn socket_routes() -> Router<MessagingState> {
    Router::new().route("/v1/pairs/{pair_id}/socket", get(socket::connect))
}

/// Backfill and fallback routes
fn conversation_routes() -> Router<MessagingState> {
    Router::new()
        .route(
            "/v1/pairs/{pair_id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/v1/pairs/{pair_id}/seen", post(messages::mark_seen))
}

/// Create all Messaging domain routes
pub fn routes() -> Router<MessagingState> {
    Router::new()
        .merge(socket_routes())
        .merge(conversation_routes())
}
