//! Deterministic test doubles for every collaborator trait.
//!
//! None of these touch the network. Each double records how it was called so
//! tests can assert on call order and inputs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::index::InMemoryIndex;
use crate::models::{CorpusEntry, IndexSpec, SimilarityMatch, Summary};
use crate::traits::{Embedder, ExtractError, SimilarityIndex, Summarizer, TextExtractor};

/// Treats the payload as UTF-8 text.
#[derive(Default)]
pub struct PlainTextExtractor {
    calls: AtomicUsize,
}

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8], _filename: &str) -> std::result::Result<String, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ExtractError::UnsupportedType("binary payload".to_string()))
    }
}

type SummarizeFn = dyn Fn(&str) -> Result<Summary> + Send + Sync;

/// Summarizer driven by a closure over the filtered text.
pub struct ScriptedSummarizer {
    script: Box<SummarizeFn>,
    inputs: Mutex<Vec<String>>,
}

impl ScriptedSummarizer {
    pub fn from_fn(f: impl Fn(&str) -> Result<Summary> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(f),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Always returns the same summary and skills.
    pub fn fixed(summary: &str, skills: &[&str]) -> Self {
        let summary = Summary {
            summary: summary.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        };
        Self::from_fn(move |_| Ok(summary.clone()))
    }

    /// Uses the first line of the filtered text as the summary.
    pub fn first_line(skills: &[&str]) -> Self {
        let skills: Vec<String> = skills.iter().map(|s| s.to_string()).collect();
        Self::from_fn(move |text| {
            Ok(Summary {
                summary: text.lines().next().unwrap_or_default().to_string(),
                skills: skills.clone(),
            })
        })
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::from_fn(move |_| Err(anyhow!(message.clone())))
    }

    /// Filtered texts received so far, in call order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, filtered_text: &str) -> Result<Summary> {
        self.inputs.lock().unwrap().push(filtered_text.to_string());
        (self.script)(filtered_text)
    }
}

/// Embedder backed by a fixed text → vector table.
///
/// Texts without an entry fail, which keeps tests honest about exactly what
/// gets embedded.
pub struct LookupEmbedder {
    table: HashMap<String, Vec<f32>>,
    fail_with: Option<String>,
    inputs: Mutex<Vec<String>>,
}

impl LookupEmbedder {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            fail_with: None,
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Texts received so far, in call order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

impl Default for LookupEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for LookupEmbedder {
    fn model_name(&self) -> &str {
        "lookup"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inputs.lock().unwrap().push(text.to_string());
        if let Some(message) = &self.fail_with {
            bail!("{}", message);
        }
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow!("no embedding scripted for {:?}", text))
    }
}

/// One observed call on a [`RecordingIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOp {
    Ensure,
    Query,
    Upsert(String),
}

/// [`InMemoryIndex`] wrapper that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingIndex {
    inner: InMemoryIndex,
    ops: Mutex<Vec<IndexOp>>,
    fail_ensure: AtomicBool,
    fail_query: AtomicBool,
    fail_upsert: AtomicBool,
}

impl RecordingIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ops(&self) -> Vec<IndexOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<CorpusEntry> {
        self.inner.entries()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn set_fail_ensure(&self, fail: bool) {
        self.fail_ensure.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_query(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    /// Insert an entry directly, bypassing the op log.
    pub async fn seed(&self, entry: CorpusEntry) -> Result<()> {
        self.inner.upsert(&entry).await
    }

    fn record(&self, op: IndexOp) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl SimilarityIndex for RecordingIndex {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<()> {
        self.record(IndexOp::Ensure);
        if self.fail_ensure.load(Ordering::SeqCst) {
            bail!("index service unreachable");
        }
        self.inner.ensure_index(spec).await
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SimilarityMatch>> {
        self.record(IndexOp::Query);
        if self.fail_query.load(Ordering::SeqCst) {
            bail!("query timed out");
        }
        self.inner.query(embedding, k).await
    }

    async fn upsert(&self, entry: &CorpusEntry) -> Result<()> {
        self.record(IndexOp::Upsert(entry.id.clone()));
        if self.fail_upsert.load(Ordering::SeqCst) {
            bail!("upsert rejected");
        }
        self.inner.upsert(entry).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }
}
