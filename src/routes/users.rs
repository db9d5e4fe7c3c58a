use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    api::{
        extract::{AppJson, AppPath},
        AppState,
    },
    error::{AppError, AppResult},
    middleware::auth::CurrentUser,
    models::{
        user::{user_location, UserResponse},
        CreateUserRequest, NewUser, UpdateUserRequest, UserChanges,
    },
    services::auth::hash_password,
};

const DUPLICATE_USERNAME: &str = "please use a different username";
const DUPLICATE_EMAIL: &str = "please use a different email address";

/// Registers a new user
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let (Some(username), Some(email), Some(password)) =
        (request.username, request.email, request.password)
    else {
        return Err(AppError::InvalidInput(
            "must include at least username, email and password fields".to_string(),
        ));
    };

    if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            "username, email and password must not be empty".to_string(),
        ));
    }

    if state.store.user_by_username(&username).await?.is_some() {
        return Err(AppError::Duplicate(DUPLICATE_USERNAME.to_string()));
    }
    if state.store.user_by_email(&email).await?.is_some() {
        return Err(AppError::Duplicate(DUPLICATE_EMAIL.to_string()));
    }

    let user = state
        .store
        .create_user(NewUser {
            username,
            email,
            first_name: request.first_name,
            last_name: request.last_name,
            password_hash: hash_password(&password)?,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Created user");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, user_location(user.id))],
        Json(user.to_response()),
    ))
}

pub async fn get_user(
    current: CurrentUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<UserResponse>> {
    current.ensure_owner(id)?;
    Ok(Json(current.0.to_response()))
}

/// Applies a partial update; username and email stay unique
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> AppResult<StatusCode> {
    current.ensure_owner(id)?;

    let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
    if blank(&request.username) || blank(&request.email) || request.password.as_deref() == Some("") {
        return Err(AppError::InvalidInput(
            "username, email and password must not be empty".to_string(),
        ));
    }

    let user = state
        .store
        .user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(username) = request.username.as_deref() {
        if username != user.username && state.store.user_by_username(username).await?.is_some() {
            return Err(AppError::Duplicate(DUPLICATE_USERNAME.to_string()));
        }
    }
    if let Some(email) = request.email.as_deref() {
        if email != user.email && state.store.user_by_email(email).await?.is_some() {
            return Err(AppError::Duplicate(DUPLICATE_EMAIL.to_string()));
        }
    }

    let password_hash = request
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    let changes = UserChanges {
        username: request.username,
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        password_hash,
    };

    state
        .store
        .update_user(id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = id, "Updated user");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    current.ensure_owner(id)?;
    if !state.store.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}
