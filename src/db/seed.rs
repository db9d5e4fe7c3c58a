use std::path::Path;

use anyhow::Context;

use super::Store;
use crate::{error::AppError, models::NewMovie};

/// Inserts the movies of a JSON array, skipping ones already present
///
/// Returns the number of movies inserted.
pub async fn seed_movies(store: &dyn Store, movies: Vec<NewMovie>) -> anyhow::Result<usize> {
    let mut inserted = 0;
    for movie in movies {
        let title = movie.title.clone();
        match store.insert_movie(movie).await {
            Ok(movie) => {
                tracing::debug!(movie_id = movie.id, title = %movie.title, "Seeded movie");
                inserted += 1;
            }
            Err(AppError::Duplicate(_)) => {
                tracing::debug!(title = %title, "Movie already present, skipping");
            }
            Err(e) => return Err(e).with_context(|| format!("failed to seed movie {title:?}")),
        }
    }
    Ok(inserted)
}

/// Loads and inserts the catalog found at `path`
pub async fn seed_from_file(store: &dyn Store, path: impl AsRef<Path>) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let movies: Vec<NewMovie> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid seed file {}", path.display()))?;

    let total = movies.len();
    let inserted = seed_movies(store, movies).await?;
    tracing::info!(total, inserted, path = %path.display(), "Seeded movie catalog");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn catalog() -> Vec<NewMovie> {
        serde_json::from_str(
            r#"[
                {"title": "Heat", "imdb_id": "tt0113277", "video": "https://www.youtube.com/watch?v=2GfZl4kuVNI"},
                {"title": "Ronin", "description": "Mercenaries chase a case"}
            ]"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_seed_inserts_catalog() {
        let store = MemoryStore::new();
        let inserted = seed_movies(&store, catalog()).await.unwrap();
        assert_eq!(inserted, 2);

        let heat = store.movie_by_id(1).await.unwrap().unwrap();
        assert_eq!(heat.title, "Heat");
        assert_eq!(heat.ytbe_id.as_deref(), Some("2GfZl4kuVNI"));
    }

    #[tokio::test]
    async fn test_seed_twice_skips_duplicates() {
        let store = MemoryStore::new();
        seed_movies(&store, catalog()).await.unwrap();

        let inserted = seed_movies(&store, catalog()).await.unwrap();
        assert_eq!(inserted, 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let store = MemoryStore::new();
        assert!(seed_from_file(&store, "/nonexistent/movies.json").await.is_err());
    }
}
