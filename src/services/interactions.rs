use chrono::Utc;

use crate::{
    db::Store,
    error::AppResult,
    models::{Interaction, RatingSummary, Score},
};

/// Records `score` for the pair following the rate-over-watch rule
pub async fn record(
    store: &dyn Store,
    user_id: i64,
    movie_id: i64,
    score: Score,
) -> AppResult<Interaction> {
    let interaction = store
        .record_interaction(user_id, movie_id, score, Utc::now())
        .await?;

    tracing::info!(
        user_id,
        movie_id,
        requested = score.value(),
        stored = interaction.score,
        "Recorded interaction"
    );

    Ok(interaction)
}

/// Implicit interaction: watched without rating
pub async fn watch(store: &dyn Store, user_id: i64, movie_id: i64) -> AppResult<Interaction> {
    record(store, user_id, movie_id, Score::IMPLICIT).await
}

/// Explicit interaction; the rating must lie within 1..=5
pub async fn watch_rate(
    store: &dyn Store,
    user_id: i64,
    movie_id: i64,
    rating: f64,
) -> AppResult<Interaction> {
    record(store, user_id, movie_id, Score::explicit(rating)?).await
}

pub async fn unwatch(store: &dyn Store, user_id: i64, movie_id: i64) -> AppResult<bool> {
    store.delete_interaction(user_id, movie_id).await
}

pub async fn has_watched(store: &dyn Store, user_id: i64, movie_id: i64) -> AppResult<bool> {
    Ok(store.interaction(user_id, movie_id).await?.is_some())
}

pub async fn has_rated(store: &dyn Store, user_id: i64, movie_id: i64) -> AppResult<bool> {
    Ok(store
        .interaction(user_id, movie_id)
        .await?
        .is_some_and(|i| i.score().is_explicit()))
}

/// Average and count of explicit ratings, `(0.0, 0)` when there are none
pub async fn compute_aggregate_rating(store: &dyn Store, movie_id: i64) -> AppResult<RatingSummary> {
    store.rating_summary(movie_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        error::AppError,
        models::{NewMovie, NewUser},
    };

    async fn setup() -> (MemoryStore, i64, i64) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "john".to_string(),
                email: "john@example.com".to_string(),
                first_name: None,
                last_name: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let movie = store
            .insert_movie(NewMovie {
                title: "Pulp Fiction".to_string(),
                description: Some("John Travolta's movie".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        (store, user.id, movie.id)
    }

    #[tokio::test]
    async fn test_watch_then_unwatch() {
        let (store, user, movie) = setup().await;
        assert!(!has_watched(&store, user, movie).await.unwrap());

        watch(&store, user, movie).await.unwrap();
        assert!(has_watched(&store, user, movie).await.unwrap());
        assert!(!has_rated(&store, user, movie).await.unwrap());

        assert!(unwatch(&store, user, movie).await.unwrap());
        assert!(!has_watched(&store, user, movie).await.unwrap());
    }

    #[tokio::test]
    async fn test_rate_over_watch() {
        let (store, user, movie) = setup().await;
        watch(&store, user, movie).await.unwrap();
        let rated = watch_rate(&store, user, movie, 3.0).await.unwrap();

        assert_eq!(rated.score, 3.0);
        assert!(has_rated(&store, user, movie).await.unwrap());
    }

    #[tokio::test]
    async fn test_watch_does_not_downgrade_rating() {
        let (store, user, movie) = setup().await;
        watch_rate(&store, user, movie, 3.0).await.unwrap();
        let after = watch(&store, user, movie).await.unwrap();

        assert_eq!(after.score, 3.0);
        assert!(has_rated(&store, user, movie).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_rating_records_nothing() {
        let (store, user, movie) = setup().await;
        let err = watch_rate(&store, user, movie, 7.0).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(!has_watched(&store, user, movie).await.unwrap());
    }

    #[tokio::test]
    async fn test_aggregate_rating() {
        let (store, first, movie) = setup().await;
        assert_eq!(
            compute_aggregate_rating(&store, movie).await.unwrap(),
            RatingSummary::EMPTY
        );

        let mut users = vec![first];
        for name in ["paul", "mary"] {
            let user = store
                .create_user(NewUser {
                    username: name.to_string(),
                    email: format!("{}@example.com", name),
                    first_name: None,
                    last_name: None,
                    password_hash: "hash".to_string(),
                })
                .await
                .unwrap();
            users.push(user.id);
        }

        watch_rate(&store, users[0], movie, 1.0).await.unwrap();
        watch_rate(&store, users[1], movie, 5.0).await.unwrap();
        watch(&store, users[2], movie).await.unwrap();

        assert_eq!(
            compute_aggregate_rating(&store, movie).await.unwrap(),
            RatingSummary { average: 3.0, count: 2 }
        );
    }
}
