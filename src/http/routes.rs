use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Fragment ingestion
        .route("/sessions/:session_id/audio", post(handlers::ingest_audio))
        // Session lifecycle and status
        .route("/sessions/:session_id/flush", post(handlers::flush_session))
        .route(
            "/sessions/:session_id",
            get(handlers::get_session_status).delete(handlers::end_session),
        )
        .route("/stats", get(handlers::get_stats))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
