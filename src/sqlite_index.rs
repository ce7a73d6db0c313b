//! SQLite-backed similarity index.
//!
//! Embeddings are stored as little-endian `f32` BLOBs next to the entry
//! metadata. Queries load every vector of the index and rank them by cosine
//! similarity in Rust, which is adequate for a corpus of course submissions.
//!
//! # Schema
//!
//! ```text
//! index_meta(name PK, dimension, metric, created_at)
//! corpus_entries(id PK, index_name, filename, skills_json, size_bytes, embedding, admitted_at)
//! ```
//!
//! Several indexes may share one database file; entries are scoped by
//! `index_name`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use srs_guard_core::index::{cosine_similarity, rank_matches};
use srs_guard_core::models::{CorpusEntry, EntryMetadata, IndexSpec, SimilarityMatch};
use srs_guard_core::traits::SimilarityIndex;

use crate::db;

pub struct SqliteIndex {
    pool: SqlitePool,
    name: String,
}

impl SqliteIndex {
    pub async fn open(path: &Path, name: &str) -> Result<Self> {
        let pool = db::connect(path).await?;
        Ok(Self::with_pool(pool, name))
    }

    pub fn with_pool(pool: SqlitePool, name: &str) -> Self {
        Self {
            pool,
            name: name.to_string(),
        }
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_meta (
                name TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL,
                metric TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS corpus_entries (
                id TEXT PRIMARY KEY,
                index_name TEXT NOT NULL,
                filename TEXT NOT NULL,
                skills_json TEXT NOT NULL DEFAULT '[]',
                size_bytes INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                admitted_at INTEGER NOT NULL,
                FOREIGN KEY (index_name) REFERENCES index_meta(name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_corpus_entries_index ON corpus_entries(index_name)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Unix timestamp of the most recent admission, if any.
    pub async fn last_admitted(&self) -> Result<Option<i64>> {
        let ts: Option<i64> =
            sqlx::query_scalar("SELECT MAX(admitted_at) FROM corpus_entries WHERE index_name = ?")
                .bind(&self.name)
                .fetch_one(&self.pool)
                .await?;
        Ok(ts)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SimilarityIndex for SqliteIndex {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<()> {
        if spec.name != self.name {
            bail!(
                "index spec '{}' does not match opened index '{}'",
                spec.name,
                self.name
            );
        }
        self.create_tables().await?;

        // INSERT OR IGNORE: a concurrent creator winning the race is fine.
        sqlx::query(
            "INSERT OR IGNORE INTO index_meta (name, dimension, metric, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&spec.name)
        .bind(spec.dims as i64)
        .bind(spec.metric.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT dimension, metric FROM index_meta WHERE name = ?")
            .bind(&spec.name)
            .fetch_one(&self.pool)
            .await?;
        let dimension: i64 = row.get("dimension");
        let metric: String = row.get("metric");
        if dimension as usize != spec.dims || metric != spec.metric.as_str() {
            bail!(
                "index '{}' exists with dimension {} ({}), configured {} ({})",
                spec.name,
                dimension,
                metric,
                spec.dims,
                spec.metric.as_str()
            );
        }

        tracing::debug!(index = %spec.name, dims = spec.dims, "sqlite index ready");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SimilarityMatch>> {
        let rows = sqlx::query(
            "SELECT id, filename, skills_json, size_bytes, embedding FROM corpus_entries WHERE index_name = ?",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let stored = blob_to_vec(&blob);
            let skills_json: String = row.get("skills_json");
            let size_bytes: i64 = row.get("size_bytes");
            matches.push(SimilarityMatch {
                entry_id: row.get("id"),
                metadata: EntryMetadata {
                    filename: row.get("filename"),
                    skills: serde_json::from_str(&skills_json)?,
                    size_bytes: size_bytes as u64,
                },
                score: cosine_similarity(embedding, &stored) as f64,
            });
        }

        Ok(rank_matches(matches, k))
    }

    async fn upsert(&self, entry: &CorpusEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO corpus_entries (id, index_name, filename, skills_json, size_bytes, embedding, admitted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                filename = excluded.filename,
                skills_json = excluded.skills_json,
                size_bytes = excluded.size_bytes,
                embedding = excluded.embedding
            "#,
        )
        .bind(&entry.id)
        .bind(&self.name)
        .bind(&entry.metadata.filename)
        .bind(serde_json::to_string(&entry.metadata.skills)?)
        .bind(entry.metadata.size_bytes as i64)
        .bind(vec_to_blob(&entry.embedding))
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM corpus_entries WHERE index_name = ?")
                .bind(&self.name)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}

/// Encode a float vector as a BLOB of little-endian `f32` values.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
