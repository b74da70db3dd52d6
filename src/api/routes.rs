use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Recommendation pipeline
        .route("/recommendations", post(handlers::recommend))
        .route("/similar", post(handlers::similar))
        // Ratings and saved movies
        .route("/ratings", post(handlers::rate))
        .route("/users/:user_id/saved", post(handlers::save_movie))
        // History and preferences
        .route(
            "/users/:user_id/history",
            get(handlers::get_history).delete(handlers::clear_history),
        )
        .route("/users/:user_id/preferences", get(handlers::get_preferences))
        // Feedback
        .route("/feedback", post(handlers::add_feedback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
