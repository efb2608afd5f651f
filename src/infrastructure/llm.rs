//! HTTP adapter for the opaque text generation capability.
//!
//! Posts `{model, prompt, json_mode}` to a configured endpoint and reads
//! `{text}` back. Model selection, retries, and credentials are the
//! endpoint's concern, not this crate's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::models::config::LlmConfig;
use crate::domain::ports::{GenerationError, GenerationOptions, TextGenerator};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    json_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Text generator backed by a single HTTP endpoint.
pub struct HttpTextGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl HttpTextGenerator {
    /// Build from config. Returns `None` when no endpoint is configured.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        if config.endpoint.is_empty() {
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .ok()?;
        Some(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            json_mode: options.json_mode,
            max_tokens: options.max_tokens,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "Dispatching generation request");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Request(e.to_string())
                }
            })?;

        let response = response
            .error_for_status()
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        if body.text.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        if options.json_mode && serde_json::from_str::<serde_json::Value>(&body.text).is_err() {
            return Err(GenerationError::Request(
                "json_mode response did not parse as JSON".to_string(),
            ));
        }
        Ok(body.text)
    }
}
