use crate::analytics::{normalize_query, poster_url, SearchAnalytics};
use crate::error::StoreError;
use crate::types::{MovieRecord, SearchCountEntry};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process search counter, selected by an empty `database_path`.
/// Counts are lost when the process exits.
#[derive(Debug)]
pub struct MemorySearchAnalytics {
    entries: Mutex<HashMap<String, SearchCountEntry>>,
    poster_base_url: String,
}

impl MemorySearchAnalytics {
    pub fn new(poster_base_url: &str) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            poster_base_url: poster_base_url.to_string(),
        }
    }

    pub fn count_for(&self, query: &str) -> Option<u64> {
        let entries = self.entries.lock().ok()?;
        entries.get(&normalize_query(query)).map(|e| e.count)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, SearchCountEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Task("search count map poisoned".to_string()))
    }
}

#[async_trait]
impl SearchAnalytics for MemorySearchAnalytics {
    async fn record_hit(
        &self,
        query: &str,
        representative: &MovieRecord,
    ) -> Result<(), StoreError> {
        let term = normalize_query(query);
        let now = Utc::now();
        let mut entries = self.lock()?;

        entries
            .entry(term.clone())
            .and_modify(|entry| {
                entry.count += 1;
                entry.updated_at = now;
            })
            .or_insert_with(|| SearchCountEntry {
                search_term: term,
                count: 1,
                movie_id: representative.id,
                title: representative.title.clone(),
                poster_url: poster_url(&self.poster_base_url, representative),
                updated_at: now,
            });
        Ok(())
    }

    async fn trending(&self, limit: usize) -> Result<Vec<SearchCountEntry>, StoreError> {
        let entries = self.lock()?;
        let mut all: Vec<SearchCountEntry> = entries.values().cloned().collect();
        all.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.search_term.cmp(&b.search_term))
        });
        all.truncate(limit);
        Ok(all)
    }
}
