//! Index statistics.
//!
//! A quick overview of what is indexed and how: chunk and file counts,
//! the embedding model and its dimensions, when the index was built, and
//! how large the store is on disk. Used by `specrag stats`.

use anyhow::Result;
use serde::Serialize;

use crate::catalog::list_indexed_files;
use crate::config::Config;
use crate::export::read_summary;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatistics {
    pub total_chunks: usize,
    pub indexed_files: usize,
    pub model: String,
    /// Embedding dimensions; the vocabulary size for TF-IDF.
    pub dims: usize,
    pub created_at: String,
    pub store_path: String,
    pub store_size: String,
}

pub async fn statistics(session: &Session) -> Result<IndexStatistics> {
    let config = &session.config;
    let index = session.index.as_ref();

    let created_at = read_summary(&config.summary_path())?
        .map(|s| s.created_at)
        .unwrap_or_else(|| "unknown".to_string());
    let size = std::fs::metadata(&config.index.path)
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(IndexStatistics {
        total_chunks: index.count().await?,
        indexed_files: list_indexed_files(index).await?.len(),
        model: session.embedder.model_name().to_string(),
        dims: session.embedder.dims(),
        created_at,
        store_path: config.index.path.display().to_string(),
        store_size: format_bytes(size),
    })
}

/// Run the stats command: print statistics as JSON.
pub async fn run_stats(config: &Config) -> Result<()> {
    let session = Session::open_for_query(config.clone()).await?;
    let stats = statistics(&session).await?;

    println!("Database Statistics:");
    println!("{}", serde_json::to_string_pretty(&stats)?);
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
