//! OpenAI embedding client.
//!
//! Calls `POST /v1/embeddings` with the configured model and returns the
//! vector for a single input. Requires the `OPENAI_API_KEY` environment
//! variable. The engine embeds exactly one summary per request, so no
//! batching is done here.
//!
//! Embeddings are deterministic per model version only; switching
//! `embedding.model` requires rebuilding the index.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Method;

use srs_guard_core::traits::Embedder;

use crate::config::EmbeddingConfig;
use crate::http::{self, JsonRequest};

pub const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Embedding provider using the OpenAI API.
pub struct OpenAIEmbedder {
    /// Model name (e.g. `"text-embedding-3-small"`).
    model: String,
    api_key: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not in the environment or the
    /// HTTP client cannot be built.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = http::env_secret("OPENAI_API_KEY")?;
        Self::with_endpoint(config, api_key, OPENAI_EMBEDDINGS_URL)
    }

    /// Create an embedder against an explicit endpoint (OpenAI-compatible
    /// gateways, local proxies).
    pub fn with_endpoint(config: &EmbeddingConfig, api_key: String, url: &str) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            api_key,
            url: url.to_string(),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let json = http::send_json(
            &self.client,
            &JsonRequest {
                service: "OpenAI",
                method: Method::POST,
                url: self.url.clone(),
                headers: &headers,
                body: Some(&body),
            },
            self.max_retries,
        )
        .await?;

        parse_openai_response(&json)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty embedding response"))
    }
}

/// Parse the OpenAI embeddings API response JSON.
///
/// Extracts the `data[].embedding` arrays and returns them ordered by
/// their `index` field.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());

    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;

        let vec = embedding
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| anyhow!("Invalid OpenAI response: non-numeric embedding value"))
            })
            .collect::<Result<Vec<f32>>>()?;

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .unwrap_or(position as u64);
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_orders_by_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [0.5, 0.5] },
                { "index": 0, "embedding": [1.0, -1.0] }
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, -1.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn missing_data_is_an_error() {
        let err = parse_openai_response(&serde_json::json!({ "error": "nope" })).unwrap_err();
        assert!(err.to_string().contains("missing data"));
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let json = serde_json::json!({ "data": [{ "index": 0, "embedding": [1.0, "x"] }] });
        assert!(parse_openai_response(&json).is_err());
    }
}
