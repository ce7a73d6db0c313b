//! Core data models used throughout SRS Guard.
//!
//! These types represent the corpus entries, similarity matches, and
//! decisions that flow through the plagiarism pipeline.

use serde::{Deserialize, Serialize};

/// Metadata stored alongside every admitted embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Original upload name. Display key only; not unique across the corpus.
    pub filename: String,
    pub skills: Vec<String>,
    pub size_bytes: u64,
}

/// A persisted record in the similarity index.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: EntryMetadata,
}

impl CorpusEntry {
    /// Build an entry with a freshly generated id of the form
    /// `"{filename-slug}-{uuid}"`. Two uploads with the same filename
    /// always get distinct ids.
    pub fn new(embedding: Vec<f32>, metadata: EntryMetadata) -> Self {
        let id = format!("{}-{}", slugify(&metadata.filename), uuid::Uuid::new_v4());
        Self {
            id,
            embedding,
            metadata,
        }
    }
}

fn slugify(filename: &str) -> String {
    let mut slug = String::with_capacity(filename.len());
    let mut last_dash = true;
    for c in filename.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "document".to_string()
    } else {
        slug.chars().take(48).collect()
    }
}

/// One result of a nearest-neighbor query. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    pub entry_id: String,
    pub metadata: EntryMetadata,
    /// Cosine similarity between the query and the stored embedding.
    pub score: f64,
}

/// Output of the summarizer: a prose summary and, separately, the
/// technologies the document mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl Summary {
    /// Trim skill tokens, drop empty ones, and drop case-insensitive
    /// duplicates while keeping first occurrences in their original order.
    pub fn distinct_skills(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.to_lowercase()))
            .map(str::to_string)
            .collect()
    }
}

/// The verdict returned for one upload.
///
/// Field names and types are part of the public contract; the HTTP layer
/// serializes this struct verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub plagiarism_detected: bool,
    pub max_score: f64,
    pub matched_files: Vec<String>,
    pub threshold: f64,
    pub document_added: bool,
}

/// Distance metric of a similarity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
        }
    }
}

/// Fixed configuration an index is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dims: usize,
    pub metric: Metric,
}

impl IndexSpec {
    pub fn cosine(name: impl Into<String>, dims: usize) -> Self {
        Self {
            name: name.into(),
            dims,
            metric: Metric::Cosine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(filename: &str) -> EntryMetadata {
        EntryMetadata {
            filename: filename.to_string(),
            skills: vec![],
            size_bytes: 10,
        }
    }

    #[test]
    fn entry_ids_are_unique_per_call() {
        let a = CorpusEntry::new(vec![1.0], meta("Library SRS.pdf"));
        let b = CorpusEntry::new(vec![1.0], meta("Library SRS.pdf"));
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("library-srs-pdf-"));
    }

    #[test]
    fn slug_falls_back_for_symbol_only_names() {
        assert_eq!(slugify("???.."), "document");
        assert_eq!(slugify(""), "document");
    }

    #[test]
    fn distinct_skills_keeps_first_occurrence_order() {
        let s = Summary {
            summary: "x".into(),
            skills: vec![
                "Rust".into(),
                " PostgreSQL ".into(),
                "rust".into(),
                "".into(),
                "Docker".into(),
                "postgresql".into(),
            ],
        };
        assert_eq!(s.distinct_skills(), vec!["Rust", "PostgreSQL", "Docker"]);
    }

    #[test]
    fn decision_serializes_contract_fields() {
        let d = Decision {
            plagiarism_detected: false,
            max_score: 0.0,
            matched_files: vec![],
            threshold: 0.75,
            document_added: true,
        };
        let v = serde_json::to_value(&d).unwrap();
        let obj = v.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "document_added",
                "matched_files",
                "max_score",
                "plagiarism_detected",
                "threshold"
            ]
        );
    }

    #[test]
    fn summary_skills_default_to_empty() {
        let s: Summary = serde_json::from_str(r#"{"summary":"only prose"}"#).unwrap();
        assert!(s.skills.is_empty());
    }
}
