use serde::{Deserialize, Serialize};

use super::{interaction::RatingSummary, API_PREFIX};

const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// A movie in the catalog
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
    /// YouTube video id of the trailer
    pub ytbe_id: Option<String>,
}

impl Movie {
    pub fn to_response(&self, rating: RatingSummary) -> MovieResponse {
        MovieResponse {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            imdb_id: self.imdb_id.clone(),
            tmdb_id: self.tmdb_id.clone(),
            ytbe_id: self.ytbe_id.clone(),
            rating: rating.average,
            rating_count: rating.count,
            links: MovieLinks {
                self_link: format!("{}/movie/{}", API_PREFIX, self.id),
                video: self
                    .ytbe_id
                    .as_ref()
                    .map(|id| format!("{}{}", YOUTUBE_WATCH_URL, id)),
            },
        }
    }
}

/// A movie together with its rating aggregate, as returned by listings
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RatedMovie {
    #[sqlx(flatten)]
    pub movie: Movie,
    pub rating: f64,
    pub rating_count: i64,
}

impl RatedMovie {
    pub fn to_response(&self) -> MovieResponse {
        self.movie.to_response(RatingSummary {
            average: self.rating,
            count: self.rating_count,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
    pub ytbe_id: Option<String>,
    pub rating: f64,
    pub rating_count: i64,
    #[serde(rename = "_links")]
    pub links: MovieLinks,
}

#[derive(Debug, Serialize)]
pub struct MovieLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub video: Option<String>,
}

/// Catalog entry as found in a seed file
///
/// `video` may hold a full YouTube URL; it is reduced to the video id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<String>,
    #[serde(default)]
    pub ytbe_id: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

impl NewMovie {
    /// The YouTube id, taken from `ytbe_id` or extracted from `video`
    pub fn youtube_id(&self) -> Option<String> {
        self.ytbe_id
            .clone()
            .or_else(|| self.video.as_deref().and_then(youtube_id_from_url))
    }
}

/// Extracts the video id from `watch?v=` or short/embed style URLs
pub fn youtube_id_from_url(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    };

    if let Some(query) = query {
        let v = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "v")
            .map(|(_, value)| value);
        if let Some(v) = v.filter(|v| !v.is_empty()) {
            return Some(v.to_string());
        }
    }

    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains('.'))
        .map(str::to_string)
}
