//! OpenAI chat-completions summarizer.
//!
//! Asks the model for a single structured JSON object holding the summary
//! and the skill list, so the two never share one free-text field. The
//! response is constrained with a strict `json_schema` response format.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Method;

use srs_guard_core::models::Summary;
use srs_guard_core::traits::Summarizer;

use crate::config::SummarizerConfig;
use crate::http::{self, JsonRequest};

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "\
You summarize student Software Requirements Specification (SRS) documents.

The text you receive has already been reduced to these sections: Purpose, \
Product Scope, Product Perspective, Product Functions and System Features.

Return a JSON object with two fields:
- \"summary\": 5 to 7 short bullet points covering the project title, the \
problem it solves, its main features or modules, and anything unusual about \
it. Do not name programming languages, frameworks, libraries, tools, cloud \
platforms or databases in the summary.
- \"skills\": the programming languages, frameworks, libraries, tools, cloud \
platforms and databases the document mentions, one per array element.";

/// [`Summarizer`] backed by an OpenAI chat model.
pub struct OpenAISummarizer {
    model: String,
    temperature: f32,
    api_key: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAISummarizer {
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let api_key = http::env_secret("OPENAI_API_KEY")?;
        Self::with_endpoint(config, api_key, OPENAI_CHAT_URL)
    }

    pub fn with_endpoint(config: &SummarizerConfig, api_key: String, url: &str) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            url: url.to_string(),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }

    fn request_body(&self, filtered_text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": filtered_text },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "srs_summary",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "summary": { "type": "string" },
                            "skills": { "type": "array", "items": { "type": "string" } },
                        },
                        "required": ["summary", "skills"],
                        "additionalProperties": false,
                    },
                },
            },
        })
    }
}

#[async_trait]
impl Summarizer for OpenAISummarizer {
    async fn summarize(&self, filtered_text: &str) -> Result<Summary> {
        let body = self.request_body(filtered_text);
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

        let summary = parse_chat_response(&json)?;
        tracing::debug!(
            model = %self.model,
            summary_chars = summary.summary.len(),
            skills = summary.skills.len(),
            "summarized"
        );
        Ok(summary)
    }
}

/// Pull the structured [`Summary`] out of a chat-completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<Summary> {
    let message = json
        .pointer("/choices/0/message")
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message"))?;

    if let Some(refusal) = message.get("refusal").and_then(|r| r.as_str()) {
        anyhow::bail!("model refused to summarize: {}", refusal);
    }

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing message content"))?;

    serde_json::from_str(content.trim()).context("summary is not valid JSON")
}
