use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    models::User,
    services::auth,
};

fn authorization_header(parts: &Parts) -> AppResult<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))
}

/// User authenticated by a live bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Only the owner may touch resources under their id
    pub fn ensure_owner(&self, user_id: i64) -> AppResult<()> {
        if self.0.id != user_id {
            tracing::warn!(caller = self.0.id, target = user_id, "Access denied");
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = authorization_header(parts)?;
        let user = auth::authenticate_bearer(state.store.as_ref(), header, Utc::now()).await?;
        Ok(CurrentUser(user))
    }
}

/// User authenticated by HTTP Basic credentials
#[derive(Debug, Clone)]
pub struct BasicUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for BasicUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = authorization_header(parts)?;
        let user = auth::authenticate_basic(state.store.as_ref(), header).await?;
        Ok(BasicUser(user))
    }
}
