use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Map sessions
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:id", delete(handlers::delete_session))
        .route("/sessions/:id/location", post(handlers::report_location))
        .route("/sessions/:id/map", get(handlers::get_map))
        .route("/sessions/:id/recommendation", get(handlers::get_recommendation))
        // Recommendation modes
        .route("/sessions/:id/recommend/saved", post(handlers::recommend_saved))
        .route("/sessions/:id/recommend/nearby", post(handlers::recommend_nearby))
        // Map interaction
        .route("/sessions/:id/route", post(handlers::route))
        .route("/sessions/:id/candidates/:index/focus", post(handlers::focus_candidate))
        .route("/sessions/:id/markers/:index/click", post(handlers::click_marker))
        // Stateless helpers
        .route("/distance", get(handlers::distance))
}
