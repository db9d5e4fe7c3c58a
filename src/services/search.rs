use std::collections::BTreeSet;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{Page, PageRequest, RatedMovie},
};

/// Minimum trigram similarity for a lexeme to replace a keyword
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

/// A normalized keyword query; all terms must match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub terms: Vec<String>,
}

impl SearchQuery {
    /// Lower-cases the input and splits it into alphanumeric keywords
    pub fn parse(raw: &str) -> AppResult<Self> {
        let terms: Vec<String> = keywords(raw).collect();
        if terms.is_empty() {
            return Err(AppError::InvalidInput(
                "query must contain at least one keyword".to_string(),
            ));
        }
        Ok(Self { terms })
    }

    /// Renders the terms as a `to_tsquery` expression
    pub fn to_tsquery(&self) -> String {
        self.terms.join(" & ")
    }
}

/// Splits text into lower-case alphanumeric words
pub fn keywords(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Trigrams of a single word, padded the way `pg_trgm` pads them
pub fn trigrams(word: &str) -> BTreeSet<String> {
    let padded: Vec<char> = format!("  {} ", word.to_lowercase()).chars().collect();
    padded
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Shared trigrams over all distinct trigrams of both words
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);
    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;
    if union == 0 {
        return 0.0;
    }
    shared as f64 / union as f64
}

/// Closest lexeme above [`SIMILARITY_THRESHOLD`]; ties go to the smaller word
pub fn nearest_lexeme<'a>(word: &str, lexemes: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    lexemes
        .into_iter()
        .map(|lexeme| (similarity(word, lexeme), lexeme))
        .filter(|(score, _)| *score >= SIMILARITY_THRESHOLD)
        .max_by(|(sa, la), (sb, lb)| sa.total_cmp(sb).then_with(|| lb.cmp(la)))
        .map(|(_, lexeme)| lexeme)
}

/// Replaces each keyword with its nearest lexeme, keeping unmatched ones
///
/// Lexemes go through [`keywords`] again, so a host or URL token stored in
/// `unique_lexeme` can never carry tsquery operators into the query.
pub async fn rewrite(store: &dyn Store, query: SearchQuery) -> AppResult<SearchQuery> {
    let mut terms = Vec::with_capacity(query.terms.len());
    for term in query.terms {
        let lexeme = match store.nearest_lexeme(&term).await? {
            Some(lexeme) if lexeme != term => lexeme,
            _ => {
                terms.push(term);
                continue;
            }
        };

        let normalized: Vec<String> = keywords(&lexeme).collect();
        if normalized.is_empty() {
            terms.push(term);
        } else {
            tracing::debug!(keyword = %term, lexeme = %lexeme, "Rewrote search keyword");
            terms.extend(normalized);
        }
    }
    Ok(SearchQuery { terms })
}

/// Runs a keyword search, returning one page of ranked movies
///
/// Ranking happens in the store; this side only normalizes the raw query
/// and rewrites misspelled keywords to the closest known lexeme.
pub async fn search_movies(
    store: &dyn Store,
    raw: &str,
    page: PageRequest,
) -> AppResult<Page<RatedMovie>> {
    let query = rewrite(store, SearchQuery::parse(raw)?).await?;
    tracing::info!(query = %query.to_tsquery(), page = page.page, "Searching movies");
    store.search_movies(&query, page).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockStore;

    #[test]
    fn test_parse_normalizes() {
        let query = SearchQuery::parse("  Pulp-Fiction!! 1994 ").unwrap();
        assert_eq!(query.terms, vec!["pulp", "fiction", "1994"]);
        assert_eq!(query.to_tsquery(), "pulp & fiction & 1994");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(SearchQuery::parse("  !!  ").is_err());
    }

    #[test]
    fn test_trigrams_are_padded() {
        let t = trigrams("cat");
        assert_eq!(t.len(), 4);
        assert!(t.contains("  c"));
        assert!(t.contains("at "));
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("matrix", "matrix"), 1.0);
        assert!(similarity("matrix", "matrx") > SIMILARITY_THRESHOLD);
        assert_eq!(similarity("pulp", "matrix"), 0.0);
    }

    #[test]
    fn test_nearest_lexeme() {
        let lexemes = ["matrix", "fiction", "pulp"];
        assert_eq!(nearest_lexeme("matrx", lexemes), Some("matrix"));
        assert_eq!(nearest_lexeme("fictoin", lexemes), Some("fiction"));
        assert_eq!(nearest_lexeme("zzz", lexemes), None);
    }

    #[tokio::test]
    async fn test_rewrite_keeps_unknown_terms() {
        let mut store = MockStore::new();
        store
            .expect_nearest_lexeme()
            .times(2)
            .returning(|keyword| match keyword {
                "matrx" => Ok(Some("matrix".to_string())),
                _ => Ok(None),
            });

        let query = SearchQuery::parse("matrx zzz").unwrap();
        let rewritten = rewrite(&store, query).await.unwrap();
        assert_eq!(rewritten.terms, vec!["matrix", "zzz"]);
    }

    #[tokio::test]
    async fn test_rewrite_splits_lexemes_with_operators() {
        let mut store = MockStore::new();
        store
            .expect_nearest_lexeme()
            .times(2)
            .returning(|keyword| match keyword {
                "examplecom" => Ok(Some("www.example.com/a&b".to_string())),
                _ => Ok(Some("!:*".to_string())),
            });

        let query = SearchQuery::parse("examplecom heist").unwrap();
        let rewritten = rewrite(&store, query).await.unwrap();
        assert_eq!(rewritten.terms, vec!["www", "example", "com", "a", "b", "heist"]);
        assert_eq!(rewritten.to_tsquery(), "www & example & com & a & b & heist");
    }
}
