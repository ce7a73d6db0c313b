//! Corpus statistics.
//!
//! Used by `srs-guard stats` to confirm which index is in use and how many
//! documents have been admitted. Needs no API keys except for the Pinecone
//! backend.

use anyhow::{Context, Result};

use srs_guard_core::traits::SimilarityIndex;

use crate::app;
use crate::config::Config;
use crate::sqlite_index::SqliteIndex;

/// Run the stats command: query the index and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let spec = config.index_spec();

    println!("SRS Guard: Corpus Stats");
    println!("=======================");
    println!();
    println!("  Backend:     {}", config.index.backend);
    println!("  Index:       {}", spec.name);
    println!("  Dimensions:  {}", spec.dims);
    println!("  Threshold:   {}", config.detection.threshold);
    println!("  Top-k:       {}", config.detection.top_k);

    if config.index.backend == "sqlite" {
        let path = config
            .index
            .path
            .as_deref()
            .context("index.path must be set when backend is 'sqlite'")?;
        let index = SqliteIndex::open(path, &spec.name).await?;
        index.ensure_index(&spec).await?;

        let entries = index.count().await?;
        let last = index.last_admitted().await?;
        let db_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        println!("  Database:    {}", path.display());
        println!("  Size:        {}", format_bytes(db_size));
        println!();
        println!("  Documents:   {}", entries);
        println!(
            "  Last added:  {}",
            last.map(format_ts_relative)
                .unwrap_or_else(|| "never".to_string())
        );
        index.close().await;
    } else {
        let index = app::open_index(config).await?;
        index.ensure_index(&spec).await?;
        println!();
        println!("  Documents:   {}", index.count().await?);
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
