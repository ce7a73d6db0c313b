//! `srs-guard init` and `srs-guard check`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::app;
use crate::config::Config;

/// Create the configured index if it does not exist yet.
pub async fn run_init(config: &Config) -> Result<()> {
    let index = app::open_index(config).await?;
    index.ensure_index(&config.index_spec()).await?;
    println!(
        "Index '{}' ready ({} backend, {} dimensions).",
        config.index.name, config.index.backend, config.index.dims
    );
    Ok(())
}

/// Run one local file through the pipeline and print the decision as JSON.
///
/// An admitted file is added to the corpus exactly as an HTTP upload would be.
pub async fn run_check(config: &Config, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", file.display()))?;

    let engine = app::build_engine(config).await?;
    let decision = engine.process(&bytes, &filename).await?;

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
