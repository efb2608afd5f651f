//! HTTP adapter for the web search capability.
//!
//! Queries a configured endpoint (`GET <endpoint>?q=<query>`) expecting a
//! JSON array of `{title, url, snippet}` objects.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::models::config::SearchConfig;
use crate::domain::ports::{SearchError, SearchResult, Searcher};

/// Searcher backed by a single HTTP endpoint.
pub struct HttpSearcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearcher {
    /// Build from config. Returns `None` when no endpoint is configured.
    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        if config.endpoint.is_empty() {
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .ok()?;
        Some(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Searcher for HttpSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| SearchError::Request(e.to_string()))?;

        response
            .json::<Vec<SearchResult>>()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))
    }
}
