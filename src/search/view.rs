//! Render snapshot for the search screen
//!
//! The rendering layer only ever sees a [`SearchView`]: the query it typed and
//! the current `{items, loading, error}`. Which banner to show is decided
//! here so every front end words things the same way.

use crate::error::SearchError;
use crate::fetch::FetchState;
use crate::types::{MovieRecord, SearchResults};

pub const EMPTY_RESULTS_MESSAGE: &str = "No Movies Found";
pub const EMPTY_QUERY_MESSAGE: &str = "Search For A Movie";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub query: String,
    pub items: Vec<MovieRecord>,
    pub loading: bool,
    pub error: Option<SearchError>,
}

/// Banners the screen can show above (or instead of) the result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNotice {
    Loading,
    Error(String),
    ResultsHeader(String),
    Empty(&'static str),
}

impl SearchView {
    pub fn from_state(query: &str, state: &FetchState<SearchResults>) -> Self {
        Self {
            query: query.to_string(),
            items: state
                .data
                .as_ref()
                .map(|results| results.movies.clone())
                .unwrap_or_default(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    pub fn notices(&self) -> Vec<ViewNotice> {
        let mut notices = Vec::new();
        let has_query = !self.query.trim().is_empty();

        if self.loading {
            notices.push(ViewNotice::Loading);
        }
        if let Some(err) = &self.error {
            notices.push(ViewNotice::Error(format!("Error : {}", err)));
        }
        if !self.loading && self.error.is_none() {
            if self.items.is_empty() {
                notices.push(ViewNotice::Empty(if has_query {
                    EMPTY_RESULTS_MESSAGE
                } else {
                    EMPTY_QUERY_MESSAGE
                }));
            } else if has_query {
                notices.push(ViewNotice::ResultsHeader(format!(
                    "Search Result for {}",
                    self.query
                )));
            }
        }

        notices
    }

    /// Plain-text rendering, one line per notice followed by one per movie.
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .notices()
            .into_iter()
            .map(|notice| match notice {
                ViewNotice::Loading => "Loading...".to_string(),
                ViewNotice::Error(text) | ViewNotice::ResultsHeader(text) => text,
                ViewNotice::Empty(text) => text.to_string(),
            })
            .collect();

        lines.extend(self.items.iter().map(format_movie));
        lines
    }
}

pub fn format_movie(movie: &MovieRecord) -> String {
    match movie.release_year() {
        Some(year) => format!("{} ({}) ★ {:.1}", movie.title, year, movie.vote_average),
        None => format!("{} ★ {:.1}", movie.title, movie.vote_average),
    }
}
