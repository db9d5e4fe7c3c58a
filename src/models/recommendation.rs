use chrono::{DateTime, Utc};

/// A ranked movie suggestion produced by an external recommender
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Recommendation {
    pub user_id: i64,
    pub rank: i32,
    pub movie_id: i64,
    pub timestamp: DateTime<Utc>,
    /// Name of the recommender that produced the row
    pub recommender_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecommendation {
    pub rank: i32,
    pub movie_id: i64,
    pub recommender_name: Option<String>,
}
