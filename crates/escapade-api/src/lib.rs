//! Escapade API — HTTP surface of the conversation engine.
//!
//! Exposes the messaging gateway webhook, the out-of-band initial message
//! trigger, a progress query and a health check.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the application router without middleware layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::webhook::router())
        .nest("/api/v1", routes::initial_message::router())
        .nest("/api/v1/progress", routes::progress::router())
        .with_state(state)
}
