//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the storage seam of spec-rag: indexing
//! clears and fills it, retrieval queries it. Implementations must be
//! `Send + Sync` to work with async runtimes.
//!
//! Backends: [`memory::InMemoryIndex`] here, plus the SQLite and JSON
//! snapshot indexes in the `spec-rag` app crate.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ChunkMetadata;

/// A chunk together with its vector, as written to an index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub vector: Vec<f32>,
}

/// A stored chunk without its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A nearest-neighbour match.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query vector.
    pub distance: f64,
}

/// Restricts which chunks a query or listing considers, by file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFilter {
    /// Path contains the substring.
    Contains(String),
    /// Path equals the string.
    Exact(String),
}

impl PathFilter {
    pub fn matches(&self, file_path: &str) -> bool {
        match self {
            PathFilter::Contains(needle) => file_path.contains(needle.as_str()),
            PathFilter::Exact(path) => file_path == path,
        }
    }
}

/// Abstract vector index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`clear`](VectorIndex::clear) | Drop every stored chunk |
/// | [`upsert`](VectorIndex::upsert) | Insert records, replacing equal ids |
/// | [`query`](VectorIndex::query) | Nearest chunks by cosine distance |
/// | [`count`](VectorIndex::count) | Number of stored chunks |
/// | [`chunks`](VectorIndex::chunks) | Stored chunks in insertion order |
/// | [`flush`](VectorIndex::flush) | Persist buffered writes |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn clear(&self) -> Result<()>;

    async fn upsert(&self, records: &[IndexRecord]) -> Result<()>;

    /// Up to `k` matches ordered by ascending distance.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PathFilter>,
    ) -> Result<Vec<QueryMatch>>;

    async fn count(&self) -> Result<usize>;

    async fn chunks(&self, filter: Option<&PathFilter>) -> Result<Vec<StoredChunk>>;

    /// Make prior writes durable. Backends that write through need not
    /// override this.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Rank `(distance, record)` pairs and keep the `k` nearest.
///
/// Shared by the brute-force backends. Ties are broken by id.
pub fn nearest<'a, I>(candidates: I, k: usize) -> Vec<(f64, &'a IndexRecord)>
where
    I: IntoIterator<Item = (f64, &'a IndexRecord)>,
{
    let mut scored: Vec<(f64, &IndexRecord)> = candidates.into_iter().collect();
    scored.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_filter_contains() {
        let f = PathFilter::Contains("a/".to_string());
        assert!(f.matches("a/x.md"));
        assert!(f.matches("data/x.md"));
        assert!(!f.matches("b/y.md"));
    }

    #[test]
    fn test_path_filter_exact() {
        let f = PathFilter::Exact("a/x.md".to_string());
        assert!(f.matches("a/x.md"));
        assert!(!f.matches("a/x.md.bak"));
    }
}
