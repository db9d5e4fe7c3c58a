use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt::Display, str::FromStr};

use crate::error::{AppError, AppResult};

use super::API_PREFIX;

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

/// Score stored on an interaction
///
/// `0.0` is the implicit sentinel (watched without rating). Every other
/// value is an explicit rating between [`MIN_RATING`] and [`MAX_RATING`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score(f64);

impl Score {
    pub const IMPLICIT: Score = Score(0.0);

    /// Validates an explicit 1-5 rating
    pub fn explicit(rating: f64) -> AppResult<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(AppError::InvalidInput(
                "Rating must be in between 1 and 5".to_string(),
            ));
        }
        Ok(Score(rating))
    }

    /// Wraps a score read back from storage
    pub fn from_stored(value: f64) -> Self {
        Score(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_explicit(self) -> bool {
        self.0 != Self::IMPLICIT.0
    }

    /// Decides what to write when `incoming` is recorded over `existing`.
    ///
    /// Returns `None` when the stored row must stay untouched: an implicit
    /// watch never downgrades an existing interaction.
    pub fn merge(existing: Option<Score>, incoming: Score) -> Option<Score> {
        match existing {
            None => Some(incoming),
            Some(_) if incoming.is_explicit() => Some(incoming),
            Some(_) => None,
        }
    }
}

/// Join row between a user and a movie
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Interaction {
    pub user_id: i64,
    pub movie_id: i64,
    pub timestamp: DateTime<Utc>,
    pub score: f64,
}

impl Interaction {
    pub fn score(&self) -> Score {
        Score::from_stored(self.score)
    }

    /// Serializes the interaction; the explicit view carries the rating
    pub fn to_response(&self, explicit: bool) -> InteractionResponse {
        InteractionResponse {
            user_id: self.user_id,
            movie_id: self.movie_id,
            timestamp: self.timestamp,
            rating: explicit.then_some(self.score),
            links: InteractionLinks {
                user: format!("{}/user/{}", API_PREFIX, self.user_id),
                movie: format!("{}/movie/{}", API_PREFIX, self.movie_id),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    pub user_id: i64,
    pub movie_id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(rename = "_links")]
    pub links: InteractionLinks,
}

#[derive(Debug, Serialize)]
pub struct InteractionLinks {
    pub user: String,
    pub movie: String,
}

/// `{user_id}:{movie_id}` path segment identifying an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionKey {
    pub user_id: i64,
    pub movie_id: i64,
}

impl FromStr for InteractionKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidInput(format!("invalid interaction key '{}'", s));
        let (user, movie) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            user_id: user.parse().map_err(|_| invalid())?,
            movie_id: movie.parse().map_err(|_| invalid())?,
        })
    }
}

impl Display for InteractionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user_id, self.movie_id)
    }
}

/// Average and count of the explicit ratings of a movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, sqlx::FromRow)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

impl RatingSummary {
    pub const EMPTY: RatingSummary = RatingSummary {
        average: 0.0,
        count: 0,
    };

    /// Aggregates explicit scores, skipping implicit ones
    pub fn from_scores(scores: impl IntoIterator<Item = Score>) -> Self {
        let (sum, count) = scores
            .into_iter()
            .filter(|s| s.is_explicit())
            .fold((0.0, 0i64), |(sum, count), s| (sum + s.value(), count + 1));

        if count == 0 {
            return Self::EMPTY;
        }

        Self {
            average: sum / count as f64,
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_rating_bounds() {
        assert!(Score::explicit(1.0).is_ok());
        assert!(Score::explicit(5.0).is_ok());
        assert!(Score::explicit(0.0).is_err());
        assert!(Score::explicit(5.5).is_err());
        assert!(Score::explicit(f64::NAN).is_err());
    }

    #[test]
    fn test_merge_rate_over_watch() {
        let rated = Score::explicit(3.0).unwrap();
        assert_eq!(Score::merge(Some(Score::IMPLICIT), rated), Some(rated));
    }

    #[test]
    fn test_merge_never_downgrades() {
        let rated = Score::explicit(3.0).unwrap();
        assert_eq!(Score::merge(Some(rated), Score::IMPLICIT), None);
        assert_eq!(Score::merge(Some(Score::IMPLICIT), Score::IMPLICIT), None);
    }

    #[test]
    fn test_merge_first_interaction_inserts() {
        assert_eq!(Score::merge(None, Score::IMPLICIT), Some(Score::IMPLICIT));
    }

    #[test]
    fn test_rating_summary_ignores_implicit() {
        let summary = RatingSummary::from_scores([
            Score::explicit(1.0).unwrap(),
            Score::explicit(5.0).unwrap(),
            Score::IMPLICIT,
        ]);
        assert_eq!(summary, RatingSummary { average: 3.0, count: 2 });
    }

    #[test]
    fn test_rating_summary_empty() {
        assert_eq!(RatingSummary::from_scores([Score::IMPLICIT]), RatingSummary::EMPTY);
        assert_eq!(RatingSummary::from_scores([]), RatingSummary::EMPTY);
    }

    #[test]
    fn test_interaction_key_parse() {
        let key: InteractionKey = "12:34".parse().unwrap();
        assert_eq!(key, InteractionKey { user_id: 12, movie_id: 34 });
        assert_eq!(key.to_string(), "12:34");

        assert!("12".parse::<InteractionKey>().is_err());
        assert!("a:1".parse::<InteractionKey>().is_err());
    }

    #[test]
    fn test_implicit_view_hides_rating() {
        let interaction = Interaction {
            user_id: 1,
            movie_id: 2,
            timestamp: Utc::now(),
            score: 4.0,
        };
        let implicit = serde_json::to_value(interaction.to_response(false)).unwrap();
        assert!(implicit.get("rating").is_none());
        assert_eq!(implicit["_links"]["movie"], "/api/movie/2");

        let explicit = serde_json::to_value(interaction.to_response(true)).unwrap();
        assert_eq!(explicit["rating"], 4.0);
    }
}
