//! # SRS Guard
//!
//! Plagiarism detection for student Software Requirements Specification
//! documents.
//!
//! An uploaded PDF or DOCX is reduced to its key sections, summarized by a
//! chat model, embedded, and compared against every document admitted so
//! far. If no stored document scores at or above the threshold, the new one
//! joins the corpus.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌────────────┐
//! │ Extract  │──▶│ Sections │──▶│ Summarizer │──▶│ Embedder │──▶│   Index    │
//! │ PDF/DOCX │   │  filter  │   │  (OpenAI)  │   │ (OpenAI) │   │   query    │
//! └──────────┘   └──────────┘   └────────────┘   └──────────┘   └─────┬──────┘
//!                                                                     ▼
//!                                                    threshold ─▶ upsert if original
//! ```
//!
//! The pipeline itself lives in the `srs-guard-core` crate
//! ([`srs_guard_core::DecisionEngine`]); this crate supplies the concrete
//! collaborators, configuration, CLI, and HTTP server.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`summarizer`] | OpenAI structured summarizer |
//! | [`embedding`] | OpenAI embeddings |
//! | [`sqlite_index`] | Local SQLite similarity index |
//! | [`pinecone`] | Pinecone serverless similarity index |
//! | [`app`] | Engine wiring |
//! | [`server`] | HTTP server |

pub mod app;
pub mod check;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod pinecone;
pub mod server;
pub mod sqlite_index;
pub mod stats;
pub mod summarizer;
