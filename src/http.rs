//! JSON-over-HTTP helper shared by the OpenAI and Pinecone clients.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors (including timeouts) → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Retrying here is collaborator-level only: once the retries are spent the
//! error surfaces to the decision engine, which aborts the request.

use anyhow::{bail, Result};
use reqwest::{Method, StatusCode};
use std::time::Duration;

/// A JSON endpoint call that failed with a non-retryable status.
#[derive(Debug, thiserror::Error)]
#[error("{service} API error {status}: {body}")]
pub struct ApiError {
    pub service: &'static str,
    pub status: StatusCode,
    pub body: String,
}

/// Build a client with a whole-request timeout.
pub fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Read a required secret from the environment.
pub fn env_secret(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{} environment variable not set", name),
    }
}

/// One JSON request description.
pub struct JsonRequest<'a> {
    pub service: &'static str,
    pub method: Method,
    pub url: String,
    pub headers: &'a [(&'static str, String)],
    pub body: Option<&'a serde_json::Value>,
}

/// Send a JSON request with retry/backoff and decode the JSON response.
///
/// Non-retryable failures come back as an [`ApiError`] inside the
/// `anyhow::Error`, so callers can `downcast_ref` to inspect the status.
pub async fn send_json(
    client: &reqwest::Client,
    request: &JsonRequest<'_>,
    max_retries: u32,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(service = request.service, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        let mut builder = client
            .request(request.method.clone(), &request.url)
            .header("Content-Type", "application/json");
        for (name, value) in request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }

        match builder.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let text = response.text().await?;
                    if text.trim().is_empty() {
                        return Ok(serde_json::Value::Null);
                    }
                    return Ok(serde_json::from_str(&text)?);
                }

                let body = response.text().await.unwrap_or_default();

                // Rate limited or server error, retry
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    tracing::warn!(service = request.service, %status, "transient API error");
                    last_err = Some(anyhow::Error::new(ApiError {
                        service: request.service,
                        status,
                        body,
                    }));
                    continue;
                }

                // Client error (not 429), no retry
                return Err(anyhow::Error::new(ApiError {
                    service: request.service,
                    status,
                    body,
                }));
            }
            Err(e) => {
                tracing::warn!(service = request.service, error = %e, "request failed");
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} request failed after retries", request.service)))
}

/// Status of a failed call, if the server answered at all.
pub fn api_status(err: &anyhow::Error) -> Option<StatusCode> {
    err.downcast_ref::<ApiError>().map(|e| e.status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_is_recoverable_from_anyhow() {
        let err = anyhow::Error::new(ApiError {
            service: "Pinecone",
            status: StatusCode::CONFLICT,
            body: "already exists".to_string(),
        });
        assert_eq!(api_status(&err), Some(StatusCode::CONFLICT));
        assert_eq!(
            err.to_string(),
            "Pinecone API error 409 Conflict: already exists"
        );
        assert_eq!(api_status(&anyhow::anyhow!("network down")), None);
    }

    #[test]
    fn env_secret_rejects_missing_and_blank() {
        assert!(env_secret("SRS_GUARD_TEST_SURELY_UNSET_VAR").is_err());
    }
}
