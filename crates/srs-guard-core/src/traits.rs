//! Collaborator traits for the plagiarism pipeline.
//!
//! The [`DecisionEngine`](crate::engine::DecisionEngine) never talks to a
//! concrete provider. It is handed one implementation of each trait at
//! construction and sequences them:
//!
//! ```text
//! TextExtractor → filter_sections → Summarizer → Embedder → SimilarityIndex
//! ```
//!
//! Network-backed traits return `anyhow::Result`; the engine classifies any
//! failure by the stage it happened in (see [`PipelineError`](crate::error::PipelineError)).
//! Test doubles for every trait live in [`mock`](crate::mock).

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CorpusEntry, IndexSpec, SimilarityMatch, Summary};

/// Extraction failure.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The payload is not a document type the extractor understands.
    #[error("unsupported document type: {0}")]
    UnsupportedType(String),

    /// The payload claims a supported type but no text could be read from it.
    #[error("{0}")]
    Unreadable(String),
}

/// Pulls raw text out of a binary document payload.
///
/// Extraction is CPU-bound and synchronous; the payload is held in memory
/// only, never written to disk.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], filename: &str) -> std::result::Result<String, ExtractError>;
}

/// Produces a summary and a skill list from filtered SRS text.
///
/// Both fields must come from one structured generation, so that skills do
/// not leak into the summary text that gets embedded.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, filtered_text: &str) -> Result<Summary>;
}

/// Maps text to a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Persistent nearest-neighbor store of admitted documents.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ensure_index`](SimilarityIndex::ensure_index) | Create the index if absent (idempotent) |
/// | [`query`](SimilarityIndex::query) | Top-k cosine matches, descending |
/// | [`upsert`](SimilarityIndex::upsert) | Store an entry, idempotent by id |
/// | [`count`](SimilarityIndex::count) | Number of stored entries |
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Create the index with `spec` if it does not exist yet.
    ///
    /// Must succeed when the index already exists, including when another
    /// process created it between this call's check and its create.
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Return at most `k` matches sorted by descending score. An empty
    /// index yields an empty vector.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SimilarityMatch>>;

    async fn upsert(&self, entry: &CorpusEntry) -> Result<()>;

    async fn count(&self) -> Result<u64>;
}
