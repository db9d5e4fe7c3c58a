use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    api::{
        extract::{AppPath, AppQuery},
        AppState,
    },
    error::{AppError, AppResult},
    middleware::auth::CurrentUser,
    models::{
        movie::MovieResponse, Collection, Page, PageParams, PageRequest, RatedMovie, API_PREFIX,
    },
    services::{interactions, search},
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

fn envelope(
    page: Page<RatedMovie>,
    request: PageRequest,
    endpoint: &str,
    extra: &[(&str, &str)],
) -> Json<Collection<MovieResponse>> {
    Json(Collection::build(
        page.map(|m| m.to_response()),
        request,
        endpoint,
        extra,
    ))
}

pub async fn get_movie(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<MovieResponse>> {
    let movie = state
        .store
        .movie_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))?;
    let rating = interactions::compute_aggregate_rating(state.store.as_ref(), id).await?;

    Ok(Json(movie.to_response(rating)))
}

/// Most watched movies first
pub async fn top_popular(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PageParams>,
) -> AppResult<Json<Collection<MovieResponse>>> {
    let request = PageRequest::from_params(&params, state.config.max_per_page);
    let page = state.store.top_popular(request).await?;

    let endpoint = format!("{}/movie/toppop", API_PREFIX);
    Ok(envelope(page, request, &endpoint, &[]))
}

pub async fn watched(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<PageParams>,
) -> AppResult<Json<Collection<MovieResponse>>> {
    current.ensure_owner(id)?;
    let request = PageRequest::from_params(&params, state.config.max_per_page);
    let page = state.store.watched_movies(id, request).await?;

    let endpoint = format!("{}/movie/watched/{}", API_PREFIX, id);
    Ok(envelope(page, request, &endpoint, &[]))
}

/// Recommendations stored for the user by the external recommender
pub async fn recommended(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<PageParams>,
) -> AppResult<Json<Collection<MovieResponse>>> {
    current.ensure_owner(id)?;
    let request = PageRequest::from_params(&params, state.config.max_per_page);
    let page = state.store.recommended_movies(id, request).await?;

    let endpoint = format!("{}/movie/recommended/{}", API_PREFIX, id);
    Ok(envelope(page, request, &endpoint, &[]))
}

pub async fn search_by_keywords(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<SearchParams>,
) -> AppResult<Json<Collection<MovieResponse>>> {
    let q = params
        .q
        .ok_or_else(|| AppError::InvalidInput("must include a q parameter".to_string()))?;
    let request = PageRequest::new(params.page, params.per_page, state.config.max_per_page);
    let page = search::search_movies(state.store.as_ref(), &q, request).await?;

    let endpoint = format!("{}/movie/searchByKeywords", API_PREFIX);
    Ok(envelope(page, request, &endpoint, &[("q", &q)]))
}
