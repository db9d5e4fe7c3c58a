use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    api::AppState,
    error::{ApiMessage, AppError},
};

pub mod interactions;
pub mod movies;
pub mod tokens;
pub mod users;

/// API routes, nested under /api
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Users
        .route("/user", post(users::create_user))
        .route(
            "/user/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Tokens
        .route(
            "/token",
            post(tokens::get_token).delete(tokens::revoke_token),
        )
        // Movies
        .route("/movie/toppop", get(movies::top_popular))
        .route("/movie/searchByKeywords", get(movies::search_by_keywords))
        .route("/movie/watched/:id", get(movies::watched))
        .route("/movie/recommended/:id", get(movies::recommended))
        .route("/movie/:id", get(movies::get_movie))
        // Interactions
        .route("/interaction", post(interactions::create_interaction))
        .route("/interaction/:key/explicit", get(interactions::get_explicit))
        .route("/interaction/:key/implicit", get(interactions::get_implicit))
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Unmatched paths answer with the JSON error envelope
pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// Known path, unsupported method
pub async fn method_not_allowed() -> ApiMessage {
    ApiMessage::new(
        StatusCode::METHOD_NOT_ALLOWED,
        Some("The method is not allowed for the requested URL".to_string()),
    )
}
