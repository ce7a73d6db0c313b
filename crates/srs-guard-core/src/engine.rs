//! The decision engine: sequences the collaborators and applies the
//! threshold policy.
//!
//! # State machine
//!
//! ```text
//! Received → Extracted → Filtered → Summarized → Embedded → Queried → Decided ─┬→ Persisted
//!     │          │           │           │            │          │         │     └→ Rejected
//!     └──────────┴───────────┴───────────┴────────────┴──────────┴─────────┴──→ Failed
//! ```
//!
//! Every arrow is exactly one collaborator call. A failure anywhere ends the
//! run in `Failed` with a [`PipelineError`]; nothing is retried and nothing is
//! persisted. The index is queried strictly before the new document is
//! upserted, so a document is never compared against itself.
//!
//! # Concurrency
//!
//! The engine holds no per-request state and is shared across requests via
//! `Arc`. Two near-identical uploads processed concurrently may both query
//! the index before either upserts, and both be admitted. No cross-request
//! lock prevents this.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::{PipelineError, Result};
use crate::index::rank_matches;
use crate::models::{CorpusEntry, Decision, EntryMetadata, IndexSpec, SimilarityMatch};
use crate::sections::filter_sections;
use crate::traits::{Embedder, ExtractError, SimilarityIndex, Summarizer, TextExtractor};

/// Immutable detection policy, fixed at engine construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Scores at or above this value count as plagiarism.
    pub threshold: f64,
    /// Number of nearest neighbors to consider.
    pub top_k: usize,
    /// Expected embedding length.
    pub dims: usize,
    /// Largest accepted payload.
    pub max_upload_bytes: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            top_k: 3,
            dims: 1536,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Position of one document in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Extracted,
    Filtered,
    Summarized,
    Embedded,
    Queried,
    Decided,
    Persisted,
    Rejected,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStage::Persisted | PipelineStage::Rejected | PipelineStage::Failed
        )
    }
}

/// Apply the threshold policy to the top-k matches.
///
/// `matches` must be sorted by descending score. The first document ever
/// processed sees no matches and is always admitted.
pub fn decide(matches: &[SimilarityMatch], threshold: f64) -> Decision {
    let max_score = matches.first().map(|m| m.score).unwrap_or(0.0);
    let plagiarism_detected = max_score >= threshold;
    let matched_files = matches
        .iter()
        .filter(|m| m.score >= threshold)
        .map(|m| m.metadata.filename.clone())
        .collect();

    Decision {
        plagiarism_detected,
        max_score,
        matched_files,
        threshold,
        document_added: !plagiarism_detected,
    }
}

/// Stage bookkeeping for a single run.
struct Run<'a> {
    filename: &'a str,
    stages: Vec<PipelineStage>,
}

impl<'a> Run<'a> {
    fn new(filename: &'a str) -> Self {
        Self {
            filename,
            stages: vec![PipelineStage::Received],
        }
    }

    fn stage(&self) -> PipelineStage {
        self.stages
            .last()
            .copied()
            .unwrap_or(PipelineStage::Received)
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(!self.stage().is_terminal());
        tracing::debug!(filename = self.filename, from = ?self.stage(), to = ?next, "pipeline stage");
        self.stages.push(next);
    }

    fn fail(&mut self, err: &PipelineError) {
        tracing::warn!(
            filename = self.filename,
            stage = ?self.stage(),
            kind = %err.kind(),
            error = %err,
            "pipeline failed"
        );
        self.stages.push(PipelineStage::Failed);
    }
}

/// Orchestrates extraction, filtering, summarization, embedding, search,
/// and conditional admission of one document at a time.
pub struct DecisionEngine {
    config: DetectionConfig,
    index_spec: IndexSpec,
    extractor: Arc<dyn TextExtractor>,
    summarizer: Arc<dyn Summarizer>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
    index_ready: OnceCell<()>,
}

impl DecisionEngine {
    pub fn new(
        config: DetectionConfig,
        index_spec: IndexSpec,
        extractor: Arc<dyn TextExtractor>,
        summarizer: Arc<dyn Summarizer>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
    ) -> Self {
        Self {
            config,
            index_spec,
            extractor,
            summarizer,
            embedder,
            index,
            index_ready: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn index_spec(&self) -> &IndexSpec {
        &self.index_spec
    }

    /// Create the index if absent. Runs at most once per engine; a failed
    /// attempt is retried by the next caller.
    pub async fn ensure_index(&self) -> Result<()> {
        self.index_ready
            .get_or_try_init(|| async { self.index.ensure_index(&self.index_spec).await })
            .await
            .map_err(PipelineError::index)?;
        Ok(())
    }

    /// Number of admitted documents.
    pub async fn corpus_size(&self) -> Result<u64> {
        self.ensure_index().await?;
        self.index.count().await.map_err(PipelineError::index)
    }

    /// Evaluate one uploaded document.
    ///
    /// Returns a [`Decision`] or exactly one [`PipelineError`], never both.
    /// The document is added to the corpus only when no plagiarism was found.
    pub async fn process(&self, bytes: &[u8], filename: &str) -> Result<Decision> {
        self.process_with_trace(bytes, filename).await.0
    }

    /// Like [`process`](Self::process), also returning the stages visited.
    pub async fn process_with_trace(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> (Result<Decision>, Vec<PipelineStage>) {
        let mut run = Run::new(filename);
        tracing::info!(filename, size_bytes = bytes.len(), "processing document");

        let result = self.run_pipeline(&mut run, bytes, filename).await;
        match &result {
            Ok(decision) => tracing::info!(
                filename,
                plagiarism_detected = decision.plagiarism_detected,
                max_score = decision.max_score,
                matched = decision.matched_files.len(),
                document_added = decision.document_added,
                "decision"
            ),
            Err(err) => run.fail(err),
        }
        (result, run.stages)
    }

    async fn run_pipeline(&self, run: &mut Run<'_>, bytes: &[u8], filename: &str) -> Result<Decision> {
        self.validate(bytes, filename)?;

        let raw_text = self
            .extractor
            .extract(bytes, filename)
            .map_err(|e| match e {
                ExtractError::UnsupportedType(t) => {
                    PipelineError::InvalidInput(format!("unsupported document type: {}", t))
                }
                ExtractError::Unreadable(msg) => PipelineError::UnreadableDocument(msg),
            })?;
        if raw_text.trim().is_empty() {
            return Err(PipelineError::UnreadableDocument(
                "document contains no extractable text".to_string(),
            ));
        }
        run.advance(PipelineStage::Extracted);

        let filtered = filter_sections(&raw_text);
        if filtered.is_empty() {
            return Err(PipelineError::UnreadableDocument(
                "no recognized SRS sections (Purpose, Product Scope, Product Perspective, \
                 Product Functions, System Features)"
                    .to_string(),
            ));
        }
        tracing::debug!(filename, sections = ?filtered.sections, "sections kept");
        run.advance(PipelineStage::Filtered);

        let summary = self
            .summarizer
            .summarize(&filtered.text)
            .await
            .map_err(PipelineError::summarizer)?;
        if summary.summary.trim().is_empty() {
            return Err(PipelineError::summarizer("empty summary"));
        }
        let skills = summary.distinct_skills();
        run.advance(PipelineStage::Summarized);

        let embedding = self
            .embedder
            .embed(&summary.summary)
            .await
            .map_err(PipelineError::embedder)?;
        if embedding.len() != self.config.dims {
            return Err(PipelineError::embedder(format!(
                "{} returned {} dimensions, expected {}",
                self.embedder.model_name(),
                embedding.len(),
                self.config.dims
            )));
        }
        run.advance(PipelineStage::Embedded);

        self.ensure_index().await?;
        let matches = self
            .index
            .query(&embedding, self.config.top_k)
            .await
            .map_err(PipelineError::index)?;
        let matches = self.normalize(matches);
        run.advance(PipelineStage::Queried);

        let decision = decide(&matches, self.config.threshold);
        run.advance(PipelineStage::Decided);

        if decision.document_added {
            let entry = CorpusEntry::new(
                embedding,
                EntryMetadata {
                    filename: filename.to_string(),
                    skills,
                    size_bytes: bytes.len() as u64,
                },
            );
            self.index
                .upsert(&entry)
                .await
                .map_err(PipelineError::index)?;
            tracing::info!(filename, id = %entry.id, "document added to corpus");
            run.advance(PipelineStage::Persisted);
        } else {
            run.advance(PipelineStage::Rejected);
        }

        Ok(decision)
    }

    fn validate(&self, bytes: &[u8], filename: &str) -> Result<()> {
        if filename.trim().is_empty() {
            return Err(PipelineError::InvalidInput("filename is required".to_string()));
        }
        if bytes.is_empty() {
            return Err(PipelineError::InvalidInput("document is empty".to_string()));
        }
        if bytes.len() as u64 > self.config.max_upload_bytes {
            return Err(PipelineError::InvalidInput(format!(
                "document is {} bytes, limit is {} bytes",
                bytes.len(),
                self.config.max_upload_bytes
            )));
        }
        Ok(())
    }

    /// Clamp scores into `[0, 1]` and re-rank, so `decide` always sees at
    /// most `top_k` matches in descending order.
    fn normalize(&self, matches: Vec<SimilarityMatch>) -> Vec<SimilarityMatch> {
        let clamped = matches
            .into_iter()
            .map(|mut m| {
                m.score = m.score.clamp(0.0, 1.0);
                m
            })
            .collect();
        rank_matches(clamped, self.config.top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(filename: &str, score: f64) -> SimilarityMatch {
        SimilarityMatch {
            entry_id: format!("{}-id", filename),
            metadata: EntryMetadata {
                filename: filename.to_string(),
                skills: vec![],
                size_bytes: 1,
            },
            score,
        }
    }

    #[test]
    fn no_matches_means_original() {
        let d = decide(&[], 0.75);
        assert_eq!(
            d,
            Decision {
                plagiarism_detected: false,
                max_score: 0.0,
                matched_files: vec![],
                threshold: 0.75,
                document_added: true,
            }
        );
    }

    #[test]
    fn score_equal_to_threshold_is_plagiarism() {
        let d = decide(&[m("a.pdf", 0.75)], 0.75);
        assert!(d.plagiarism_detected);
        assert!(!d.document_added);
        assert_eq!(d.max_score, 0.75);
        assert_eq!(d.matched_files, vec!["a.pdf"]);
    }

    #[test]
    fn score_just_below_threshold_is_admitted() {
        let d = decide(&[m("a.pdf", 0.7499)], 0.75);
        assert!(!d.plagiarism_detected);
        assert!(d.document_added);
        assert!(d.matched_files.is_empty());
        assert_eq!(d.max_score, 0.7499);
    }

    #[test]
    fn matched_files_keep_order_and_skip_low_scores() {
        let d = decide(&[m("a.pdf", 0.9), m("b.pdf", 0.8), m("c.pdf", 0.6)], 0.75);
        assert!(d.plagiarism_detected);
        assert_eq!(d.max_score, 0.9);
        assert_eq!(d.matched_files, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn duplicate_filenames_are_reported_per_match() {
        let d = decide(&[m("srs.pdf", 0.95), m("srs.pdf", 0.85)], 0.75);
        assert_eq!(d.matched_files, vec!["srs.pdf", "srs.pdf"]);
    }

    #[test]
    fn threshold_is_echoed() {
        let d = decide(&[m("a.pdf", 0.5)], 0.4);
        assert_eq!(d.threshold, 0.4);
        assert!(d.plagiarism_detected);
    }

    #[test]
    fn terminal_stages() {
        assert!(PipelineStage::Persisted.is_terminal());
        assert!(PipelineStage::Rejected.is_terminal());
        assert!(PipelineStage::Failed.is_terminal());
        assert!(!PipelineStage::Decided.is_terminal());
    }

    #[test]
    fn default_policy() {
        let c = DetectionConfig::default();
        assert_eq!(c.threshold, 0.75);
        assert_eq!(c.top_k, 3);
        assert_eq!(c.dims, 1536);
        assert_eq!(c.max_upload_bytes, 10_485_760);
    }
}
