use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod client_id;
pub mod config;
pub mod error;
pub mod gemini;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod prompt;
pub mod quota;
pub mod relay;
pub mod state;

use handlers::{health_handler, journal_handler, metrics_handler};
use state::AppState;

// router with all routes
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/gemini", post(journal_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
