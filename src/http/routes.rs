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
        // Observation
        .route("/recording", get(handlers::get_recording))
        .route("/recording/artifact", get(handlers::get_artifact))
        // Recording control
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/upload", post(handlers::upload_recording))
        .route("/recording/download", post(handlers::download_recording))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
