use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::{
    api::AppState,
    error::AppResult,
    middleware::auth::{BasicUser, CurrentUser},
    services::auth,
};

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Id of the token's owner
    pub sub: i64,
}

/// Exchanges basic credentials for a bearer token
pub async fn get_token(
    State(state): State<AppState>,
    BasicUser(user): BasicUser,
) -> AppResult<Json<TokenResponse>> {
    let token = auth::issue_token(
        state.store.as_ref(),
        &user,
        state.config.token_expires_in,
        Utc::now(),
    )
    .await?;

    Ok(Json(TokenResponse {
        token,
        sub: user.id,
    }))
}

pub async fn revoke_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<StatusCode> {
    auth::revoke_token(state.store.as_ref(), &user, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}
