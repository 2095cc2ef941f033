use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single movie as returned by the catalog API.
///
/// Only `id` and `title` are guaranteed; everything else is optional in the
/// upstream payload and defaults when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub overview: String,
}

impl MovieRecord {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            poster_path: None,
            release_date: None,
            vote_average: 0.0,
            overview: String::new(),
        }
    }

    pub fn with_poster(mut self, poster_path: impl Into<String>) -> Self {
        self.poster_path = Some(poster_path.into());
        self
    }

    /// Release year, if the API gave a non-empty `YYYY-MM-DD` date.
    pub fn release_year(&self) -> Option<&str> {
        self.release_date.as_deref().and_then(|date| date.get(..4))
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<MovieRecord>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

/// Aggregated usage counter for a normalized search term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCountEntry {
    pub search_term: String,
    pub count: u64,
    pub movie_id: u64,
    pub title: String,
    pub poster_url: String,
    pub updated_at: DateTime<Utc>,
}

/// Movies returned for one query, tagged with the query they were fetched for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub query: String,
    pub movies: Vec<MovieRecord>,
}

impl SearchResults {
    pub fn new(query: impl Into<String>, movies: Vec<MovieRecord>) -> Self {
        Self {
            query: query.into(),
            movies,
        }
    }

    pub fn first(&self) -> Option<&MovieRecord> {
        self.movies.first()
    }
}
