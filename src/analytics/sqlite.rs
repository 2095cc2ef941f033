//! SQLite-backed search counter.
//!
//! # Tables
//!
//! * `search_counts` - One row per normalized search term, holding the hit
//!   count and the movie that represented the term when it was first seen.
//!
//! All statements run on the blocking pool; the connection is shared behind a
//! mutex so concurrent `record_hit` calls serialize on it.

use crate::analytics::{normalize_query, poster_url, SearchAnalytics};
use crate::config::AnalyticsConfig;
use crate::error::StoreError;
use crate::types::{MovieRecord, SearchCountEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteSearchAnalytics {
    conn: Arc<Mutex<Connection>>,
    poster_base_url: String,
}

impl SqliteSearchAnalytics {
    /// Open (or create) the database at `config.database_path`.
    pub fn open(config: &AnalyticsConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(Path::new(&config.database_path))?;
        Self::with_connection(conn, &config.poster_base_url)
    }

    pub fn open_in_memory(poster_base_url: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, poster_base_url)
    }

    fn with_connection(conn: Connection, poster_base_url: &str) -> Result<Self, StoreError> {
        create_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            poster_base_url: poster_base_url.to_string(),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StoreError::Task("search count connection poisoned".to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

fn create_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS search_counts (
            search_term TEXT PRIMARY KEY,
            count INTEGER NOT NULL DEFAULT 0,
            movie_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            poster_url TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_search_counts_count ON search_counts (count DESC);",
    )?;
    Ok(())
}

fn upsert_hit(
    conn: &Connection,
    term: &str,
    representative: &MovieRecord,
    poster_url: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO search_counts (search_term, count, movie_id, title, poster_url, updated_at)
         VALUES (?1, 1, ?2, ?3, ?4, ?5)
         ON CONFLICT (search_term) DO UPDATE SET
            count = count + 1,
            updated_at = excluded.updated_at",
    )?;
    stmt.execute(params![
        term,
        representative.id as i64,
        representative.title,
        poster_url,
        now.to_rfc3339(),
    ])?;
    Ok(())
}

fn select_trending(conn: &Connection, limit: usize) -> Result<Vec<SearchCountEntry>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT search_term, count, movie_id, title, poster_url, updated_at
         FROM search_counts
         ORDER BY count DESC, search_term ASC
         LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit as i64], |row| {
        let updated_at: String = row.get(5)?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();
        Ok(SearchCountEntry {
            search_term: row.get(0)?,
            count: row.get::<_, i64>(1)? as u64,
            movie_id: row.get::<_, i64>(2)? as u64,
            title: row.get(3)?,
            poster_url: row.get(4)?,
            updated_at,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

#[async_trait]
impl SearchAnalytics for SqliteSearchAnalytics {
    async fn record_hit(
        &self,
        query: &str,
        representative: &MovieRecord,
    ) -> Result<(), StoreError> {
        let term = normalize_query(query);
        let poster = poster_url(&self.poster_base_url, representative);
        let representative = representative.clone();

        log::debug!("Recording search hit for '{}' (movie {})", term, representative.id);
        self.with_conn(move |conn| upsert_hit(conn, &term, &representative, &poster, Utc::now()))
            .await
    }

    async fn trending(&self, limit: usize) -> Result<Vec<SearchCountEntry>, StoreError> {
        self.with_conn(move |conn| select_trending(conn, limit)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_POSTER_BASE_URL;

    #[tokio::test]
    async fn test_first_hit_creates_entry_with_representative() {
        let store = SqliteSearchAnalytics::open_in_memory(DEFAULT_POSTER_BASE_URL).unwrap();
        let movie = MovieRecord::new(27205, "Inception").with_poster("/inception.jpg");

        store.record_hit("Inception", &movie).await.unwrap();

        let top = store.trending(5).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].search_term, "inception");
        assert_eq!(top[0].count, 1);
        assert_eq!(top[0].movie_id, 27205);
        assert_eq!(top[0].title, "Inception");
        assert_eq!(top[0].poster_url, "https://image.tmdb.org/t/p/w500/inception.jpg");
    }

    #[tokio::test]
    async fn test_repeat_hits_increment_and_keep_first_representative() {
        let store = SqliteSearchAnalytics::open_in_memory(DEFAULT_POSTER_BASE_URL).unwrap();
        let first = MovieRecord::new(1, "Batman");
        let second = MovieRecord::new(2, "Batman Returns");

        store.record_hit("batman", &first).await.unwrap();
        store.record_hit("  Batman  ", &second).await.unwrap();

        let top = store.trending(5).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].count, 2);
        assert_eq!(top[0].movie_id, 1);
    }
}
