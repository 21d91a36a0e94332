//! JSON summary written after every index build.
//!
//! Records what was indexed and how, so `specrag stats` (and people) can
//! tell when and with which model the index was built.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::Config;
use crate::ingest::IndexReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub total_chunks: usize,
    pub indexed_files: Vec<String>,
    /// RFC 3339 build time.
    pub created_at: String,
    /// Working directory of the build.
    pub created_in: String,
    pub model: String,
    pub chunking_policy: String,
    pub chunk_size: usize,
    pub overlap: usize,
}

impl IndexSummary {
    pub fn from_report(report: &IndexReport, config: &Config, model: &str) -> Self {
        let created_in = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Self {
            total_chunks: report.chunks_written,
            indexed_files: report.indexed_files.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            created_in,
            model: model.to_string(),
            chunking_policy: config.chunking.policy.to_string(),
            chunk_size: config.chunking.chunk_size,
            overlap: config.chunking.overlap,
        }
    }
}

pub fn write_summary(summary: &IndexSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write index summary {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote index summary");
    Ok(())
}

/// Read a summary, or `None` if it has not been written.
pub fn read_summary(path: &Path) -> Result<Option<IndexSummary>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index summary {}", path.display()))?;
    let summary = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse index summary {}", path.display()))?;
    Ok(Some(summary))
}
