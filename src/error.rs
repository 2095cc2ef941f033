//! Error types shared by the catalog client, the analytics store and the
//! configuration loader.

use thiserror::Error;

/// Failure of a catalog query.
///
/// Kept `Clone` so the last failure can be held in `FetchState` and handed
/// to every renderer that reads the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Transport level failure (DNS, connect, timeout). Retrying may help.
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a non-2xx status.
    #[error("Failed to fetch movies: {status} {message}")]
    Api { status: u16, message: String },

    /// The API answered 2xx but the body was not the expected shape.
    #[error("invalid catalog response: {0}")]
    Decode(String),
}

impl SearchError {
    /// Whether re-issuing the same query could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::Network(_) => true,
            SearchError::Api { status, .. } => *status >= 500 || *status == 429,
            SearchError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::Decode(err.to_string())
        } else {
            SearchError::Network(err.to_string())
        }
    }
}

/// Failure of the analytics store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("search count database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("search count store task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing catalog API key (set TMDB_API_KEY or api.api_key)")]
    MissingApiKey,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
