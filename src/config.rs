use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use srs_guard_core::models::{IndexSpec, Metric};
use srs_guard_core::DetectionConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionSection,
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionSection {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            top_k: default_top_k(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_threshold() -> f64 {
    0.75
}
fn default_top_k() -> usize {
    3
}
fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_index_name")]
    pub name: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_metric")]
    pub metric: String,
    /// SQLite database file (sqlite backend only).
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Serverless cloud (pinecone backend only).
    #[serde(default = "default_cloud")]
    pub cloud: String,
    /// Serverless region (pinecone backend only).
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_backend() -> String {
    "sqlite".to_string()
}
fn default_index_name() -> String {
    "plagiarism-detection".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_metric() -> String {
    "cosine".to_string()
}
fn default_cloud() -> String {
    "aws".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default = "default_summarizer_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_summarizer_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model: default_summarizer_model(),
            temperature: 0.0,
            timeout_secs: default_summarizer_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_summarizer_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_summarizer_timeout_secs() -> u64 {
    60
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Config {
    /// Detection policy handed to the decision engine.
    pub fn detection_config(&self) -> DetectionConfig {
        DetectionConfig {
            threshold: self.detection.threshold,
            top_k: self.detection.top_k,
            dims: self.index.dims,
            max_upload_bytes: self.detection.max_upload_bytes,
        }
    }

    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.index.name.clone(),
            dims: self.index.dims,
            metric: Metric::Cosine,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate detection
    if !(0.0..=1.0).contains(&config.detection.threshold) {
        anyhow::bail!("detection.threshold must be in [0.0, 1.0]");
    }
    if config.detection.top_k < 1 {
        anyhow::bail!("detection.top_k must be >= 1");
    }
    if config.detection.max_upload_bytes == 0 {
        anyhow::bail!("detection.max_upload_bytes must be > 0");
    }

    // Validate index
    if config.index.dims == 0 {
        anyhow::bail!("index.dims must be > 0");
    }
    if config.index.name.trim().is_empty() {
        anyhow::bail!("index.name must not be empty");
    }
    if config.index.metric != Metric::Cosine.as_str() {
        anyhow::bail!(
            "Unsupported index.metric: '{}'. Only 'cosine' is supported.",
            config.index.metric
        );
    }

    match config.index.backend.as_str() {
        "sqlite" => {
            if config.index.path.is_none() {
                anyhow::bail!("index.path must be set when backend is 'sqlite'");
            }
        }
        "pinecone" | "memory" => {}
        other => anyhow::bail!(
            "Unknown index backend: '{}'. Must be sqlite, pinecone, or memory.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[index]
path = "./data/corpus.sqlite"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.detection.threshold, 0.75);
        assert_eq!(config.detection.top_k, 3);
        assert_eq!(config.detection.max_upload_bytes, 10_485_760);
        assert_eq!(config.index.backend, "sqlite");
        assert_eq!(config.index.name, "plagiarism-detection");
        assert_eq!(config.index.dims, 1536);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.summarizer.model, "gpt-4o-mini");
        assert_eq!(config.summarizer.temperature, 0.0);
        assert_eq!(config.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn example_config_is_valid() {
        let config = parse_config(include_str!("../config/srs-guard.example.toml")).unwrap();
        assert_eq!(config.index.backend, "sqlite");
        assert_eq!(
            config.index.path.as_deref(),
            Some(Path::new("./data/corpus.sqlite"))
        );
        assert_eq!(config.index.region, "us-east-1");
    }

    #[test]
    fn detection_config_takes_dims_from_index() {
        let config = parse_config(
            r#"
[detection]
threshold = 0.8
top_k = 5

[index]
backend = "memory"
dims = 384
"#,
        )
        .unwrap();
        let detection = config.detection_config();
        assert_eq!(detection.threshold, 0.8);
        assert_eq!(detection.top_k, 5);
        assert_eq!(detection.dims, 384);
        assert_eq!(config.index_spec(), IndexSpec::cosine("plagiarism-detection", 384));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = parse_config("[detection]\nthreshold = 1.5\n[index]\nbackend = \"memory\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn rejects_zero_top_k() {
        let err =
            parse_config("[detection]\ntop_k = 0\n[index]\nbackend = \"memory\"\n").unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn rejects_non_cosine_metric() {
        let err = parse_config("[index]\nbackend = \"memory\"\nmetric = \"euclidean\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("cosine"));
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = parse_config("[index]\nbackend = \"redis\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown index backend"));
    }

    #[test]
    fn sqlite_backend_requires_path() {
        let err = parse_config("[index]\nbackend = \"sqlite\"\n").unwrap_err();
        assert!(err.to_string().contains("index.path"));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = load_config(Path::new("/nonexistent/srs-guard.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/srs-guard.toml"));
    }
}
