//! Pinecone serverless index over the REST API.
//!
//! The control plane (`api.pinecone.io`) describes and creates indexes; the
//! data plane lives on a per-index host that is resolved once and cached.
//! Requires the `PINECONE_API_KEY` environment variable.

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tokio::sync::OnceCell;

use srs_guard_core::models::{CorpusEntry, EntryMetadata, IndexSpec, SimilarityMatch};
use srs_guard_core::traits::SimilarityIndex;

use crate::config::IndexConfig;
use crate::http::{self, JsonRequest};

pub const PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2025-01";

/// Readiness polls after a create, one second apart.
const READY_POLLS: u32 = 60;

pub struct PineconeIndex {
    name: String,
    cloud: String,
    region: String,
    api_key: String,
    control_url: String,
    max_retries: u32,
    client: reqwest::Client,
    host: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    dimension: usize,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f64,
    #[serde(default)]
    metadata: StoredMetadata,
}

/// Metadata as Pinecone returns it: every number comes back as a float.
#[derive(Debug, Default, Deserialize)]
struct StoredMetadata {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    size_bytes: f64,
}

impl From<StoredMetadata> for EntryMetadata {
    fn from(m: StoredMetadata) -> Self {
        EntryMetadata {
            filename: m.filename,
            skills: m.skills,
            size_bytes: m.size_bytes.max(0.0) as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    #[serde(default)]
    total_vector_count: u64,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let api_key = http::env_secret("PINECONE_API_KEY")?;
        Ok(Self {
            name: config.name.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            api_key,
            control_url: PINECONE_CONTROL_URL.to_string(),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
            host: OnceCell::new(),
        })
    }

    fn headers(&self) -> [(&'static str, String); 2] {
        [
            ("Api-Key", self.api_key.clone()),
            ("X-Pinecone-API-Version", API_VERSION.to_string()),
        ]
    }

    async fn call(
        &self,
        method: Method,
        url: String,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let headers = self.headers();
        http::send_json(
            &self.client,
            &JsonRequest {
                service: "Pinecone",
                method,
                url,
                headers: &headers,
                body,
            },
            self.max_retries,
        )
        .await
    }

    /// `None` when the index does not exist.
    async fn describe(&self) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.control_url, self.name);
        match self.call(Method::GET, url, None).await {
            Ok(json) => Ok(Some(serde_json::from_value(json)?)),
            Err(e) if http::api_status(&e) == Some(StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, spec: &IndexSpec) -> Result<()> {
        let body = serde_json::json!({
            "name": spec.name,
            "dimension": spec.dims,
            "metric": spec.metric.as_str(),
            "spec": { "serverless": { "cloud": self.cloud, "region": self.region } },
        });
        let url = format!("{}/indexes", self.control_url);
        match self.call(Method::POST, url, Some(&body)).await {
            Ok(_) => {
                tracing::info!(index = %spec.name, dims = spec.dims, "created pinecone index");
                Ok(())
            }
            // Someone else created it between our describe and create.
            Err(e) if http::api_status(&e) == Some(StatusCode::CONFLICT) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn wait_ready(&self) -> Result<IndexDescription> {
        for _ in 0..READY_POLLS {
            if let Some(desc) = self.describe().await? {
                if desc.status.ready {
                    return Ok(desc);
                }
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        bail!("pinecone index '{}' not ready after {}s", self.name, READY_POLLS)
    }

    fn data_url(&self, path: &str) -> Result<String> {
        let host = self
            .host
            .get()
            .ok_or_else(|| anyhow!("pinecone index '{}' not initialized", self.name))?;
        Ok(data_plane_url(host, path))
    }
}

fn data_plane_url(host: &str, path: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}{}", host.trim_end_matches('/'), path)
    } else {
        format!("https://{}{}", host.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl SimilarityIndex for PineconeIndex {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<()> {
        self.host
            .get_or_try_init(|| async {
                let desc = match self.describe().await? {
                    Some(desc) if desc.status.ready => desc,
                    Some(_) => self.wait_ready().await?,
                    None => {
                        self.create(spec).await?;
                        self.wait_ready().await?
                    }
                };
                if desc.dimension != spec.dims {
                    bail!(
                        "pinecone index '{}' has dimension {}, configured {}",
                        spec.name,
                        desc.dimension,
                        spec.dims
                    );
                }
                Ok::<_, anyhow::Error>(desc.host)
            })
            .await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SimilarityMatch>> {
        let body = serde_json::json!({
            "vector": embedding,
            "topK": k,
            "includeMetadata": true,
        });
        let json = self
            .call(Method::POST, self.data_url("/query")?, Some(&body))
            .await?;
        let response: QueryResponse = serde_json::from_value(json)?;
        Ok(response
            .matches
            .into_iter()
            .map(|m| SimilarityMatch {
                entry_id: m.id,
                metadata: m.metadata.into(),
                score: m.score,
            })
            .collect())
    }

    async fn upsert(&self, entry: &CorpusEntry) -> Result<()> {
        let body = serde_json::json!({
            "vectors": [{
                "id": entry.id,
                "values": entry.embedding,
                "metadata": entry.metadata,
            }],
        });
        self.call(Method::POST, self.data_url("/vectors/upsert")?, Some(&body))
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let body = serde_json::json!({});
        let json = self
            .call(
                Method::POST,
                self.data_url("/describe_index_stats")?,
                Some(&body),
            )
            .await?;
        let stats: IndexStats = serde_json::from_value(json)?;
        Ok(stats.total_vector_count)
    }
}
