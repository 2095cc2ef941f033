//! HTTP client for The Movie Database (TMDB) v3 API.

use crate::config::ApiConfig;
use crate::error::{ConfigError, SearchError};
use crate::services::QueryClient;
use crate::types::{MoviePage, MovieRecord};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

/// Error body TMDB sends alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct TmdbErrorBody {
    #[serde(default)]
    status_message: Option<String>,
}

pub struct TmdbClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.to_string();
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Endpoint and query parameters for a request.
    ///
    /// Search mode hits `/search/movie`; browse mode hits `/discover/movie`
    /// sorted by popularity.
    fn request_parts(&self, query: &str, page: Option<u32>) -> (String, Vec<(&'static str, String)>) {
        let trimmed = query.trim();
        let (endpoint, mut params) = if trimmed.is_empty() {
            (
                format!("{}/discover/movie", self.base_url),
                vec![("sort_by", "popularity.desc".to_string())],
            )
        } else {
            (
                format!("{}/search/movie", self.base_url),
                vec![("query", query.to_string())],
            )
        };

        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }

        (endpoint, params)
    }
}

fn api_error(status: StatusCode, body: &str) -> SearchError {
    let message = serde_json::from_str::<TmdbErrorBody>(body)
        .ok()
        .and_then(|b| b.status_message)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_default();

    SearchError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl QueryClient for TmdbClient {
    async fn fetch_movies(
        &self,
        query: &str,
        page: Option<u32>,
    ) -> Result<Vec<MovieRecord>, SearchError> {
        let (endpoint, params) = self.request_parts(query, page);
        log::debug!("GET {} {:?}", endpoint, params);

        let response = self
            .client
            .get(&endpoint)
            .query(&params)
            .header("accept", "application/json")
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = api_error(status, &body);
            log::warn!("Catalog request failed: {}", err);
            return Err(err);
        }

        let page: MoviePage = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        log::debug!(
            "Catalog returned {} movies (page {}/{})",
            page.results.len(),
            page.page,
            page.total_pages
        );
        Ok(page.results)
    }
}
