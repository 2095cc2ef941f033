//! Services module
//!
//! Catalog access lives behind the [`QueryClient`] trait so the search
//! controller can be driven by the real HTTP client or by test doubles.

use crate::error::SearchError;
use crate::types::MovieRecord;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

pub mod tmdb;

pub use tmdb::TmdbClient;

/// Source of movie records.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Fetch one page of movies.
    ///
    /// # Arguments
    /// * `query` - Search text. Empty or whitespace-only means browse mode
    ///   (the default popularity listing); anything else means search mode.
    /// * `page` - 1-based page, `None` for the API default.
    ///
    /// # Returns
    /// Records in the order the catalog returned them.
    async fn fetch_movies(
        &self,
        query: &str,
        page: Option<u32>,
    ) -> Result<Vec<MovieRecord>, SearchError>;
}
