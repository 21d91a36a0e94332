//! Core data models used throughout spec-rag.
//!
//! These types represent the documents, sections, chunks, and search hits
//! that flow through the indexing and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Maximum characters kept in [`ChunkMetadata::chunk_preview`].
pub const PREVIEW_CHARS: usize = 200;

/// A heading and the text it governs.
///
/// `content` runs until the next heading of equal or lesser level. It is
/// derived data: chunk metadata only carries the outline (level + title).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub level: u8,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
}

impl Section {
    /// The heading alone, without body text.
    pub fn heading(&self) -> Section {
        Section {
            level: self.level,
            title: self.title.clone(),
            content: String::new(),
        }
    }
}

/// A parsed markdown file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the corpus root, `/`-separated.
    pub file_path: String,
    pub file_name: String,
    pub content: String,
    /// SHA-256 of `content`, hex encoded.
    pub hash: String,
    pub title: String,
    pub sections: Vec<Section>,
}

/// Per-chunk metadata stored next to every chunk in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub file_name: String,
    /// Size of the source file in bytes.
    pub file_size: u64,
    pub hash: String,
    pub title: String,
    pub sections: Vec<Section>,
    pub chunk_index: usize,
    pub chunk_total: usize,
    pub chunk_preview: String,
}

/// A bounded fragment of a document, ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// `{file_path}_{chunk_index}`.
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance reported by the index.
    pub distance: f64,
    /// `1 - distance`; higher is more relevant.
    pub relevance_score: f64,
}

/// Storage identity of a chunk.
pub fn chunk_id(file_path: &str, chunk_index: usize) -> String {
    format!("{}_{}", file_path, chunk_index)
}

/// Truncate `text` to `max_chars` characters, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
