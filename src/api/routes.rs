use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::AppState;
use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    models::API_PREFIX,
    routes::{api_routes, health_check, method_not_allowed, not_found},
};

/// Creates the application router with all routes and layers
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest(API_PREFIX, api_routes())
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        // Runs before the trace layer so the span sees the id
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}
