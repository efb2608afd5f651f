//! Ports to external collaborators.
//!
//! The LLM provider and the web are out of scope for this crate; everything
//! behind these traits is treated as an opaque capability. Adapters live in
//! `infrastructure`, and tests plug in scripted implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error surface of a text generation call.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Provider returned no text")]
    Empty,

    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider timed out")]
    Timeout,

    #[error("No provider configured")]
    NotConfigured,
}

/// Options for a generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// Require the response to be a single JSON document.
    pub json_mode: bool,
    /// Optional max tokens hint forwarded to the provider.
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn json() -> Self {
        Self {
            json_mode: true,
            max_tokens: None,
        }
    }
}

/// Opaque text generation capability.
///
/// Model selection, retry, and rate limiting all live behind this trait.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt. `json_mode` responses must parse as JSON;
    /// implementations should validate before returning.
    async fn generate(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, GenerationError>;

    /// Re-establish provider state after a repair (reload model catalogs,
    /// reopen connections). Default is a no-op.
    async fn reload(&self) -> Result<(), GenerationError> {
        Ok(())
    }
}

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

/// Error surface of a search call.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(String),

    #[error("No searcher configured")]
    NotConfigured,
}

/// Opaque web search capability used by AGInt's research action.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

/// Handle to a live agent instance held in the Coordinator registry.
///
/// The Coordinator calls `shutdown` when deregistering; agents without
/// teardown needs can rely on the default no-op.
#[async_trait]
pub trait AgentHandle: Send + Sync {
    /// Identifier the handle answers to.
    fn agent_id(&self) -> &str;

    /// Cooperative teardown. Default is a no-op.
    async fn shutdown(&self) {}
}
