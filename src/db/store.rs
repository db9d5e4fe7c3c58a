use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        Interaction, Movie, NewMovie, NewRecommendation, NewUser, Page, PageRequest, RatedMovie,
        RatingSummary, Score, User, UserChanges,
    },
    services::search::SearchQuery,
};

/// Storage backend behind the API
///
/// Every method is atomic on its own. Listings return the requested page
/// together with the size of the full filtered set.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Inserts a user, failing with `AppError::Duplicate` on a taken
    /// username or email
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    async fn user_by_id(&self, id: i64) -> AppResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn user_by_token(&self, token: &str) -> AppResult<Option<User>>;

    /// Returns `None` when no user has the given id
    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>>;

    /// Removes the user with its interactions and recommendations
    async fn delete_user(&self, id: i64) -> AppResult<bool>;

    async fn set_token(&self, user_id: i64, token: &str, expiration: DateTime<Utc>) -> AppResult<()>;

    /// Moves the expiry of the current token, keeping the token itself
    async fn set_token_expiration(&self, user_id: i64, expiration: DateTime<Utc>) -> AppResult<()>;

    // ------------------------------------------------------------------
    // Movies
    // ------------------------------------------------------------------

    async fn insert_movie(&self, movie: NewMovie) -> AppResult<Movie>;

    async fn movie_by_id(&self, id: i64) -> AppResult<Option<Movie>>;

    /// Aggregate of the explicit ratings of a movie
    async fn rating_summary(&self, movie_id: i64) -> AppResult<RatingSummary>;

    /// Movies by number of interactions, most watched first
    async fn top_popular(&self, page: PageRequest) -> AppResult<Page<RatedMovie>>;

    /// Movies the user interacted with, most recent first
    async fn watched_movies(&self, user_id: i64, page: PageRequest) -> AppResult<Page<RatedMovie>>;

    /// Stored recommendations for the user, by rank
    async fn recommended_movies(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<RatedMovie>>;

    async fn replace_recommendations(
        &self,
        user_id: i64,
        recommendations: Vec<NewRecommendation>,
    ) -> AppResult<()>;

    /// Closest known lexeme to `keyword`, the keyword itself when known
    async fn nearest_lexeme(&self, keyword: &str) -> AppResult<Option<String>>;

    async fn search_movies(&self, query: &SearchQuery, page: PageRequest)
        -> AppResult<Page<RatedMovie>>;

    // ------------------------------------------------------------------
    // Interactions
    // ------------------------------------------------------------------

    /// Inserts or updates the pair's interaction following `Score::merge`
    /// and returns the stored row
    async fn record_interaction(
        &self,
        user_id: i64,
        movie_id: i64,
        score: Score,
        at: DateTime<Utc>,
    ) -> AppResult<Interaction>;

    async fn interaction(&self, user_id: i64, movie_id: i64) -> AppResult<Option<Interaction>>;

    async fn delete_interaction(&self, user_id: i64, movie_id: i64) -> AppResult<bool>;
}
