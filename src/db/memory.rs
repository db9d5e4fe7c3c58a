use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        Interaction, Movie, NewMovie, NewRecommendation, NewUser, Page, PageRequest, RatedMovie,
        RatingSummary, Recommendation, Score, User, UserChanges,
    },
    services::search::{self, SearchQuery},
};

use super::Store;

const TITLE_WEIGHT: f64 = 1.0;
const DESCRIPTION_WEIGHT: f64 = 0.4;

/// In-process store for tests and database-less runs
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    users: BTreeMap<i64, User>,
    movies: BTreeMap<i64, Movie>,
    interactions: BTreeMap<(i64, i64), Interaction>,
    recommendations: BTreeMap<(i64, i32), Recommendation>,
    next_user_id: i64,
    next_movie_id: i64,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn rated(&self, movie: &Movie) -> RatedMovie {
        let summary = self.summary(movie.id);
        RatedMovie {
            movie: movie.clone(),
            rating: summary.average,
            rating_count: summary.count,
        }
    }

    fn summary(&self, movie_id: i64) -> RatingSummary {
        RatingSummary::from_scores(
            self.interactions
                .values()
                .filter(|i| i.movie_id == movie_id)
                .map(Interaction::score),
        )
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    /// Lexemes of the catalog, as `unique_lexeme` holds them
    fn lexemes(&self) -> BTreeSet<String> {
        self.movies
            .values()
            .flat_map(|m| {
                search::keywords(&m.title)
                    .chain(search::keywords(m.description.as_deref().unwrap_or("")))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Weighted term frequency; `None` unless every term occurs
fn rank(movie: &Movie, query: &SearchQuery) -> Option<f64> {
    let title: Vec<String> = search::keywords(&movie.title).collect();
    let description: Vec<String> =
        search::keywords(movie.description.as_deref().unwrap_or("")).collect();

    let mut total = 0.0;
    for term in &query.terms {
        let in_title = title.iter().filter(|w| *w == term).count() as f64;
        let in_description = description.iter().filter(|w| *w == term).count() as f64;
        if in_title + in_description == 0.0 {
            return None;
        }
        total += in_title * TITLE_WEIGHT + in_description * DESCRIPTION_WEIGHT;
    }
    Some(total)
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner.username_taken(&user.username, None) || inner.email_taken(&user.email, None) {
            return Err(AppError::Duplicate(
                "username or email already registered".to_string(),
            ));
        }

        inner.next_user_id += 1;
        let created = User {
            id: inner.next_user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            token: None,
            token_expiration: None,
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_token(&self, token: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.token.as_deref() == Some(token))
            .cloned())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        let username_taken = changes
            .username
            .as_deref()
            .is_some_and(|name| inner.username_taken(name, Some(id)));
        let email_taken = changes
            .email
            .as_deref()
            .is_some_and(|email| inner.email_taken(email, Some(id)));
        if username_taken || email_taken {
            return Err(AppError::Duplicate(
                "username or email already registered".to_string(),
            ));
        }

        Ok(inner.users.get_mut(&id).map(|user| {
            changes.apply(user);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.users.remove(&id).is_some();
        inner.interactions.retain(|(user_id, _), _| *user_id != id);
        inner.recommendations.retain(|(user_id, _), _| *user_id != id);
        Ok(removed)
    }

    async fn set_token(&self, user_id: i64, token: &str, expiration: DateTime<Utc>) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.token = Some(token.to_string());
            user.token_expiration = Some(expiration);
        }
        Ok(())
    }

    async fn set_token_expiration(&self, user_id: i64, expiration: DateTime<Utc>) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.token_expiration = Some(expiration);
        }
        Ok(())
    }

    async fn insert_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let mut inner = self.inner.write().await;
        if inner.movies.values().any(|m| m.title == movie.title) {
            return Err(AppError::Duplicate(format!(
                "movie '{}' already exists",
                movie.title
            )));
        }

        inner.next_movie_id += 1;
        let created = Movie {
            id: inner.next_movie_id,
            ytbe_id: movie.youtube_id(),
            title: movie.title,
            description: movie.description,
            imdb_id: movie.imdb_id,
            tmdb_id: movie.tmdb_id,
        };
        inner.movies.insert(created.id, created.clone());
        Ok(created)
    }

    async fn movie_by_id(&self, id: i64) -> AppResult<Option<Movie>> {
        Ok(self.inner.read().await.movies.get(&id).cloned())
    }

    async fn rating_summary(&self, movie_id: i64) -> AppResult<RatingSummary> {
        Ok(self.inner.read().await.summary(movie_id))
    }

    async fn top_popular(&self, page: PageRequest) -> AppResult<Page<RatedMovie>> {
        let inner = self.inner.read().await;
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for (_, movie_id) in inner.interactions.keys() {
            *counts.entry(*movie_id).or_default() += 1;
        }

        let mut movies: Vec<&Movie> = inner.movies.values().collect();
        // BTreeMap order is by id, so a stable sort keeps id as tiebreaker
        movies.sort_by_key(|m| std::cmp::Reverse(counts.get(&m.id).copied().unwrap_or(0)));

        let rated = movies.into_iter().map(|m| inner.rated(m)).collect();
        Ok(Page::slice(rated, page))
    }

    async fn watched_movies(&self, user_id: i64, page: PageRequest) -> AppResult<Page<RatedMovie>> {
        let inner = self.inner.read().await;
        let mut watched: Vec<&Interaction> = inner
            .interactions
            .values()
            .filter(|i| i.user_id == user_id)
            .collect();
        watched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.movie_id.cmp(&b.movie_id)));

        let rated = watched
            .into_iter()
            .filter_map(|i| inner.movies.get(&i.movie_id))
            .map(|m| inner.rated(m))
            .collect();
        Ok(Page::slice(rated, page))
    }

    async fn recommended_movies(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<RatedMovie>> {
        let inner = self.inner.read().await;
        let rated = inner
            .recommendations
            .range((user_id, i32::MIN)..=(user_id, i32::MAX))
            .filter_map(|(_, r)| inner.movies.get(&r.movie_id))
            .map(|m| inner.rated(m))
            .collect();
        Ok(Page::slice(rated, page))
    }

    async fn replace_recommendations(
        &self,
        user_id: i64,
        recommendations: Vec<NewRecommendation>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.recommendations.retain(|(uid, _), _| *uid != user_id);
        let now = Utc::now();
        for r in recommendations {
            inner.recommendations.insert(
                (user_id, r.rank),
                Recommendation {
                    user_id,
                    rank: r.rank,
                    movie_id: r.movie_id,
                    timestamp: now,
                    recommender_name: r.recommender_name,
                },
            );
        }
        Ok(())
    }

    async fn nearest_lexeme(&self, keyword: &str) -> AppResult<Option<String>> {
        let lexemes = self.inner.read().await.lexemes();
        if lexemes.contains(keyword) {
            return Ok(Some(keyword.to_string()));
        }
        Ok(search::nearest_lexeme(keyword, lexemes.iter().map(String::as_str)).map(str::to_string))
    }

    async fn search_movies(
        &self,
        query: &SearchQuery,
        page: PageRequest,
    ) -> AppResult<Page<RatedMovie>> {
        let inner = self.inner.read().await;
        let mut hits: Vec<(f64, &Movie)> = inner
            .movies
            .values()
            .filter_map(|m| rank(m, query).map(|r| (r, m)))
            .collect();
        hits.sort_by(|(ra, a), (rb, b)| rb.total_cmp(ra).then(a.id.cmp(&b.id)));

        let rated = hits.into_iter().map(|(_, m)| inner.rated(m)).collect();
        Ok(Page::slice(rated, page))
    }

    async fn record_interaction(
        &self,
        user_id: i64,
        movie_id: i64,
        score: Score,
        at: DateTime<Utc>,
    ) -> AppResult<Interaction> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if !inner.movies.contains_key(&movie_id) {
            return Err(AppError::NotFound("Movie not found".to_string()));
        }

        let key = (user_id, movie_id);
        let existing = inner.interactions.get(&key).map(Interaction::score);
        if let Some(score) = Score::merge(existing, score) {
            inner.interactions.insert(
                key,
                Interaction {
                    user_id,
                    movie_id,
                    timestamp: at,
                    score: score.value(),
                },
            );
        }

        inner
            .interactions
            .get(&key)
            .cloned()
            .ok_or_else(|| AppError::Internal("interaction vanished after write".to_string()))
    }

    async fn interaction(&self, user_id: i64, movie_id: i64) -> AppResult<Option<Interaction>> {
        Ok(self
            .inner
            .read()
            .await
            .interactions
            .get(&(user_id, movie_id))
            .cloned())
    }

    async fn delete_interaction(&self, user_id: i64, movie_id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.interactions.remove(&(user_id, movie_id)).is_some())
    }
}
