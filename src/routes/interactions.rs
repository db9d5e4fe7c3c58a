use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    api::{
        extract::{AppJson, AppPath},
        AppState,
    },
    error::{ApiMessage, AppError, AppResult},
    middleware::auth::CurrentUser,
    models::{interaction::InteractionResponse, Interaction, InteractionKey, API_PREFIX},
    services::interactions,
};

#[derive(Debug, Deserialize)]
pub struct CreateInteractionRequest {
    pub user_id: Option<i64>,
    pub movie_id: Option<i64>,
    /// Explicit 1-5 rating; absent for a plain watch
    pub rating: Option<f64>,
}

fn interaction_location(key: InteractionKey, explicit: bool) -> String {
    let kind = if explicit { "explicit" } else { "implicit" };
    format!("{}/interaction/{}/{}", API_PREFIX, key, kind)
}

/// Records a watch, or a rating when `rating` is present
pub async fn create_interaction(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(request): AppJson<CreateInteractionRequest>,
) -> AppResult<impl IntoResponse> {
    let (Some(user_id), Some(movie_id)) = (request.user_id, request.movie_id) else {
        return Err(AppError::InvalidInput(
            "must include at least user_id and movie_id fields".to_string(),
        ));
    };
    current.ensure_owner(user_id)?;

    state
        .store
        .movie_by_id(movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))?;

    let store = state.store.as_ref();
    match request.rating {
        Some(rating) => interactions::watch_rate(store, user_id, movie_id, rating).await?,
        None => interactions::watch(store, user_id, movie_id).await?,
    };

    let key = InteractionKey { user_id, movie_id };
    let location = interaction_location(key, request.rating.is_some());
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiMessage::new(
            StatusCode::CREATED,
            Some("interaction registered".to_string()),
        )),
    ))
}

/// Loads the pair's interaction after the ownership and movie checks
async fn load(
    state: &AppState,
    current: &CurrentUser,
    key: &str,
) -> AppResult<Option<Interaction>> {
    let key: InteractionKey = key.parse()?;
    current.ensure_owner(key.user_id)?;

    state
        .store
        .movie_by_id(key.movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))?;

    state.store.interaction(key.user_id, key.movie_id).await
}

pub async fn get_explicit(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(key): AppPath<String>,
) -> AppResult<Json<InteractionResponse>> {
    let interaction = load(&state, &current, &key)
        .await?
        .filter(|i| i.score().is_explicit())
        .ok_or_else(|| {
            AppError::NotFound("Rate missing for this movie from this user".to_string())
        })?;

    Ok(Json(interaction.to_response(true)))
}

pub async fn get_implicit(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(key): AppPath<String>,
) -> AppResult<Json<InteractionResponse>> {
    let interaction = load(&state, &current, &key).await?.ok_or_else(|| {
        AppError::NotFound("The user has not watched this movie yet".to_string())
    })?;

    Ok(Json(interaction.to_response(false)))
}
