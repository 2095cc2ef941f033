pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod search;
pub mod services;
pub mod types;

// 公開API
pub use analytics::{open_store, MemorySearchAnalytics, SearchAnalytics, SqliteSearchAnalytics};
pub use config::{AnalyticsTrigger, AppConfig, SearchSettings};
pub use error::{ConfigError, SearchError, StoreError};
pub use fetch::{FetchController, FetchOptions, FetchOutcome, FetchState};
pub use search::{DebouncedSearchController, SearchPhase, SearchView};
pub use services::{QueryClient, TmdbClient};
pub use types::*;
