//! In-memory [`SimilarityIndex`] implementation for tests and ephemeral runs.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`. Queries are a
//! brute-force cosine scan over every stored vector. Nothing survives the
//! process.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{CorpusEntry, IndexSpec, SimilarityMatch};
use crate::traits::SimilarityIndex;

use super::{cosine_similarity, rank_matches};

/// In-memory similarity index.
pub struct InMemoryIndex {
    spec: RwLock<Option<IndexSpec>>,
    entries: RwLock<Vec<CorpusEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            spec: RwLock::new(None),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the stored entries, in insertion order.
    pub fn entries(&self) -> Vec<CorpusEntry> {
        self.entries.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<()> {
        let mut current = self.spec.write().unwrap();
        match current.as_ref() {
            Some(existing) if existing.dims != spec.dims => bail!(
                "index '{}' exists with dimension {}, expected {}",
                existing.name,
                existing.dims,
                spec.dims
            ),
            Some(_) => {}
            None => *current = Some(spec.clone()),
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SimilarityMatch>> {
        let entries = self.entries.read().unwrap();
        let matches = entries
            .iter()
            .map(|entry| SimilarityMatch {
                entry_id: entry.id.clone(),
                metadata: entry.metadata.clone(),
                score: cosine_similarity(embedding, &entry.embedding) as f64,
            })
            .collect();
        Ok(rank_matches(matches, k))
    }

    async fn upsert(&self, entry: &CorpusEntry) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }
}
