//! Search analytics
//!
//! Records which queries produced results. The controller treats the store
//! as fire-and-forget: it calls [`SearchAnalytics::record_hit`] and only logs
//! failures. Every implementation must therefore tolerate repeated calls for
//! the same query and fold them into one counter per normalized term.

use crate::config::AnalyticsConfig;
use crate::error::StoreError;
use crate::types::{MovieRecord, SearchCountEntry};
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

pub mod memory;
pub mod sqlite;

pub use memory::MemorySearchAnalytics;
pub use sqlite::SqliteSearchAnalytics;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SearchAnalytics: Send + Sync {
    /// Increment the counter for `query`, creating it with `representative`
    /// as its cached movie when absent.
    ///
    /// `query` is passed exactly as typed; normalization is up to the store.
    async fn record_hit(
        &self,
        query: &str,
        representative: &MovieRecord,
    ) -> Result<(), StoreError>;

    /// Most searched terms, highest count first.
    async fn trending(&self, limit: usize) -> Result<Vec<SearchCountEntry>, StoreError>;
}

/// Open the store `config` asks for: SQLite at `database_path`, or an
/// in-process counter when the path is empty.
pub fn open_store(config: &AnalyticsConfig) -> Result<Arc<dyn SearchAnalytics>, StoreError> {
    if config.database_path.trim().is_empty() {
        log::info!("No search count database configured, counting in memory");
        return Ok(Arc::new(MemorySearchAnalytics::new(&config.poster_base_url)));
    }
    Ok(Arc::new(SqliteSearchAnalytics::open(config)?))
}

/// Key under which a query is counted: trimmed, inner whitespace collapsed
/// to single spaces, lowercased.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Full poster URL for a record, empty when it has no poster.
pub fn poster_url(poster_base_url: &str, representative: &MovieRecord) -> String {
    match representative.poster_path.as_deref() {
        Some(path) if !path.is_empty() => {
            format!("{}{}", poster_base_url.trim_end_matches('/'), path)
        }
        _ => String::new(),
    }
}
