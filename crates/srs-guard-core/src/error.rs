//! Error taxonomy for the plagiarism pipeline.
//!
//! Every failed [`process`](crate::engine::DecisionEngine::process) call
//! yields exactly one [`PipelineError`]. The variant tells the caller whether
//! the problem lies with the upload itself (`InvalidInput`,
//! `UnreadableDocument`) or with a backing service (`CollaboratorUnavailable`,
//! `IndexUnavailable`), which callers may treat as transient.

use serde::Serialize;
use thiserror::Error;

/// Machine-readable classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnreadableDocument,
    CollaboratorUnavailable,
    IndexUnavailable,
}

impl ErrorKind {
    /// Stable snake_case code used in logs and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::UnreadableDocument => "unreadable_document",
            ErrorKind::CollaboratorUnavailable => "collaborator_unavailable",
            ErrorKind::IndexUnavailable => "index_unavailable",
        }
    }

    /// Whether a retry of the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::CollaboratorUnavailable | ErrorKind::IndexUnavailable
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Which external service failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    Summarizer,
    Embedder,
}

impl std::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collaborator::Summarizer => f.write_str("summarizer"),
            Collaborator::Embedder => f.write_str("embedder"),
        }
    }
}

/// A failed pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: Collaborator,
        message: String,
    },

    #[error("similarity index unavailable: {0}")]
    IndexUnavailable(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidInput(_) => ErrorKind::InvalidInput,
            PipelineError::UnreadableDocument(_) => ErrorKind::UnreadableDocument,
            PipelineError::CollaboratorUnavailable { .. } => ErrorKind::CollaboratorUnavailable,
            PipelineError::IndexUnavailable(_) => ErrorKind::IndexUnavailable,
        }
    }

    pub(crate) fn summarizer(err: impl std::fmt::Display) -> Self {
        PipelineError::CollaboratorUnavailable {
            collaborator: Collaborator::Summarizer,
            message: err.to_string(),
        }
    }

    pub(crate) fn embedder(err: impl std::fmt::Display) -> Self {
        PipelineError::CollaboratorUnavailable {
            collaborator: Collaborator::Embedder,
            message: err.to_string(),
        }
    }

    pub(crate) fn index(err: impl std::fmt::Display) -> Self {
        PipelineError::IndexUnavailable(err.to_string())
    }
}

/// A specialized `Result` type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
