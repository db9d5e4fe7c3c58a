use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::{
        Interaction, Movie, NewMovie, NewRecommendation, NewUser, Page, PageRequest, RatedMovie,
        RatingSummary, Score, User, UserChanges,
    },
    services::search::SearchQuery,
};

use super::Store;

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, password_hash, \
                            token, token_expiration";

const MOVIE_COLUMNS: &str = "id, title, description, imdb_id, tmdb_id, ytbe_id";

const INTERACTION_COLUMNS: &str = "user_id, movie_id, timestamp, score";

/// Movie columns plus the explicit-rating aggregate, aliased for `RatedMovie`
const RATED_MOVIE_SELECT: &str = "\
    SELECT m.id, m.title, m.description, m.imdb_id, m.tmdb_id, m.ytbe_id, \
           COALESCE(r.average, 0)::float8 AS rating, \
           COALESCE(r.count, 0)::int8 AS rating_count \
    FROM movies m \
    LEFT JOIN ( \
        SELECT movie_id, AVG(score) AS average, COUNT(*) AS count \
        FROM interactions WHERE score <> 0 GROUP BY movie_id \
    ) r ON r.movie_id = m.id";

/// PostgreSQL error code for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL error code for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs a count query and a page query that share their leading binds
    async fn rated_page(
        &self,
        count_sql: &str,
        page_sql: &str,
        filter: Option<PageFilter<'_>>,
        page: PageRequest,
    ) -> AppResult<Page<RatedMovie>> {
        let mut count = sqlx::query_scalar::<_, i64>(count_sql);
        let mut rows = sqlx::query_as::<_, RatedMovie>(page_sql);
        match filter {
            Some(PageFilter::Id(id)) => {
                count = count.bind(id);
                rows = rows.bind(id);
            }
            Some(PageFilter::Text(text)) => {
                count = count.bind(text);
                rows = rows.bind(text);
            }
            None => {}
        }

        let total = count.fetch_one(&self.pool).await?;
        let items = rows
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }
}

/// Leading bind parameter of a paged listing
enum PageFilter<'a> {
    Id(i64),
    Text(&'a str),
}

/// Maps constraint violations to the API's error taxonomy
fn classify(err: sqlx::Error, duplicate: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return AppError::Duplicate(duplicate.to_string()),
            Some(FOREIGN_KEY_VIOLATION) => {
                return AppError::NotFound("referenced row not found".to_string())
            }
            _ => {}
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let query = format!(
            "INSERT INTO users (username, email, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "username or email already registered"))
    }

    async fn user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_by_token(&self, token: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE token = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let query = format!(
            "UPDATE users SET \
                username = COALESCE($2, username), \
                email = COALESCE($3, email), \
                first_name = COALESCE($4, first_name), \
                last_name = COALESCE($5, last_name), \
                password_hash = COALESCE($6, password_hash) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(&changes.first_name)
            .bind(&changes.last_name)
            .bind(&changes.password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "username or email already registered"))
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        // interactions and recommendations go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_token(&self, user_id: i64, token: &str, expiration: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET token = $2, token_expiration = $3 WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .bind(expiration)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_token_expiration(&self, user_id: i64, expiration: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET token_expiration = $2 WHERE id = $1")
            .bind(user_id)
            .bind(expiration)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let query = format!(
            "INSERT INTO movies (title, description, imdb_id, tmdb_id, ytbe_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {MOVIE_COLUMNS}"
        );
        let duplicate = format!("movie '{}' already exists", movie.title);
        sqlx::query_as::<_, Movie>(&query)
            .bind(&movie.title)
            .bind(&movie.description)
            .bind(&movie.imdb_id)
            .bind(&movie.tmdb_id)
            .bind(movie.youtube_id())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, &duplicate))
    }

    async fn movie_by_id(&self, id: i64) -> AppResult<Option<Movie>> {
        let query = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1");
        Ok(sqlx::query_as::<_, Movie>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn rating_summary(&self, movie_id: i64) -> AppResult<RatingSummary> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            "SELECT COALESCE(AVG(score), 0)::float8 AS average, COUNT(*) AS count \
             FROM interactions WHERE movie_id = $1 AND score <> 0",
        )
        .bind(movie_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    async fn top_popular(&self, page: PageRequest) -> AppResult<Page<RatedMovie>> {
        let page_sql = format!(
            "{RATED_MOVIE_SELECT} \
             LEFT JOIN ( \
                 SELECT movie_id, COUNT(*) AS views FROM interactions GROUP BY movie_id \
             ) v ON v.movie_id = m.id \
             ORDER BY COALESCE(v.views, 0) DESC, m.id \
             LIMIT $1 OFFSET $2"
        );
        self.rated_page("SELECT COUNT(*) FROM movies", &page_sql, None, page)
            .await
    }

    async fn watched_movies(&self, user_id: i64, page: PageRequest) -> AppResult<Page<RatedMovie>> {
        let page_sql = format!(
            "{RATED_MOVIE_SELECT} \
             JOIN interactions i ON i.movie_id = m.id \
             WHERE i.user_id = $1 \
             ORDER BY i.timestamp DESC, m.id \
             LIMIT $2 OFFSET $3"
        );
        self.rated_page(
            "SELECT COUNT(*) FROM interactions WHERE user_id = $1",
            &page_sql,
            Some(PageFilter::Id(user_id)),
            page,
        )
        .await
    }

    async fn recommended_movies(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<RatedMovie>> {
        let page_sql = format!(
            "{RATED_MOVIE_SELECT} \
             JOIN recommendations rec ON rec.movie_id = m.id \
             WHERE rec.user_id = $1 \
             ORDER BY rec.rank \
             LIMIT $2 OFFSET $3"
        );
        self.rated_page(
            "SELECT COUNT(*) FROM recommendations rec \
             JOIN movies m ON m.id = rec.movie_id WHERE rec.user_id = $1",
            &page_sql,
            Some(PageFilter::Id(user_id)),
            page,
        )
        .await
    }

    async fn replace_recommendations(
        &self,
        user_id: i64,
        recommendations: Vec<NewRecommendation>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM recommendations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for r in &recommendations {
            sqlx::query(
                "INSERT INTO recommendations (user_id, rank, movie_id, timestamp, recommender_name) \
                 VALUES ($1, $2, $3, NOW(), $4)",
            )
            .bind(user_id)
            .bind(r.rank)
            .bind(r.movie_id)
            .bind(&r.recommender_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, "duplicate recommendation rank"))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn nearest_lexeme(&self, keyword: &str) -> AppResult<Option<String>> {
        // `%` honours pg_trgm.similarity_threshold (0.3 by default)
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT word FROM unique_lexeme \
             WHERE word % $1 \
             ORDER BY similarity(word, $1) DESC, word \
             LIMIT 1",
        )
        .bind(keyword)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn search_movies(
        &self,
        query: &SearchQuery,
        page: PageRequest,
    ) -> AppResult<Page<RatedMovie>> {
        let tsquery = query.to_tsquery();
        let page_sql = format!(
            "{RATED_MOVIE_SELECT} \
             JOIN search_view sv ON sv.id = m.id \
             WHERE sv.document @@ to_tsquery('english', $1) \
             ORDER BY ts_rank(sv.document, to_tsquery('english', $1)) DESC, m.id \
             LIMIT $2 OFFSET $3"
        );
        self.rated_page(
            "SELECT COUNT(*) FROM search_view WHERE document @@ to_tsquery('english', $1)",
            &page_sql,
            Some(PageFilter::Text(&tsquery)),
            page,
        )
        .await
    }

    async fn record_interaction(
        &self,
        user_id: i64,
        movie_id: i64,
        score: Score,
        at: DateTime<Utc>,
    ) -> AppResult<Interaction> {
        // Same rule as `Score::merge`: an implicit watch never overwrites a row
        let upsert = format!(
            "INSERT INTO interactions (user_id, movie_id, timestamp, score) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, movie_id) DO UPDATE \
                 SET score = EXCLUDED.score, timestamp = EXCLUDED.timestamp \
                 WHERE EXCLUDED.score <> 0 \
             RETURNING {INTERACTION_COLUMNS}"
        );
        let written = sqlx::query_as::<_, Interaction>(&upsert)
            .bind(user_id)
            .bind(movie_id)
            .bind(at)
            .bind(score.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "interaction already exists"))?;

        match written {
            Some(interaction) => Ok(interaction),
            None => self
                .interaction(user_id, movie_id)
                .await?
                .ok_or_else(|| AppError::Internal("interaction vanished after upsert".to_string())),
        }
    }

    async fn interaction(&self, user_id: i64, movie_id: i64) -> AppResult<Option<Interaction>> {
        let query = format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions WHERE user_id = $1 AND movie_id = $2"
        );
        Ok(sqlx::query_as::<_, Interaction>(&query)
            .bind(user_id)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_interaction(&self, user_id: i64, movie_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM interactions WHERE user_id = $1 AND movie_id = $2")
            .bind(user_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
