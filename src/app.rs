//! Wiring: turn a [`Config`] into a ready [`DecisionEngine`].

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use srs_guard_core::index::InMemoryIndex;
use srs_guard_core::traits::SimilarityIndex;
use srs_guard_core::DecisionEngine;

use crate::config::Config;
use crate::embedding::OpenAIEmbedder;
use crate::extract::DocumentExtractor;
use crate::pinecone::PineconeIndex;
use crate::sqlite_index::SqliteIndex;
use crate::summarizer::OpenAISummarizer;

/// Open the similarity index selected by `[index].backend`.
pub async fn open_index(config: &Config) -> Result<Arc<dyn SimilarityIndex>> {
    let index: Arc<dyn SimilarityIndex> = match config.index.backend.as_str() {
        "sqlite" => {
            let path = config
                .index
                .path
                .as_deref()
                .context("index.path must be set when backend is 'sqlite'")?;
            Arc::new(SqliteIndex::open(path, &config.index.name).await?)
        }
        "pinecone" => Arc::new(PineconeIndex::new(&config.index)?),
        "memory" => {
            tracing::warn!("using in-memory index; the corpus is lost on exit");
            Arc::new(InMemoryIndex::new())
        }
        other => bail!("Unknown index backend: '{}'", other),
    };
    Ok(index)
}

/// Build the engine with the production collaborators.
///
/// Fails fast if a required API key is missing.
pub async fn build_engine(config: &Config) -> Result<DecisionEngine> {
    let summarizer = OpenAISummarizer::new(&config.summarizer)?;
    let embedder = OpenAIEmbedder::new(&config.embedding)?;
    let index = open_index(config).await?;

    tracing::info!(
        backend = %config.index.backend,
        index = %config.index.name,
        dims = config.index.dims,
        embedding_model = %config.embedding.model,
        summarizer_model = %config.summarizer.model,
        "engine configured"
    );

    Ok(DecisionEngine::new(
        config.detection_config(),
        config.index_spec(),
        Arc::new(DocumentExtractor),
        Arc::new(summarizer),
        Arc::new(embedder),
        index,
    ))
}
