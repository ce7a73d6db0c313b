//! # SRS Guard Core
//!
//! Provider-independent logic for SRS Guard: data models, the error
//! taxonomy, the section filter, collaborator traits, the similarity index
//! abstraction, and the decision engine.
//!
//! This crate performs no network or filesystem I/O. Concrete collaborators
//! (OpenAI, SQLite, Pinecone, PDF extraction) live in the `srs-guard` crate;
//! deterministic doubles live in [`mock`].

pub mod engine;
pub mod error;
pub mod index;
pub mod mock;
pub mod models;
pub mod sections;
pub mod traits;

pub use engine::{decide, DecisionEngine, DetectionConfig, PipelineStage};
pub use error::{ErrorKind, PipelineError};
