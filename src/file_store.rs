//! Flat-file [`VectorIndex`]: a JSON snapshot read and replaced wholesale.
//!
//! Writes go to an in-memory index; [`VectorIndex::flush`] serializes it
//! to a temporary file next to the snapshot and renames it over the old
//! one, so readers never see a half-written snapshot. Vectors are stored
//! sparsely since TF-IDF vectors are mostly zeros.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use spec_rag_core::error::RagError;
use spec_rag_core::models::ChunkMetadata;
use spec_rag_core::store::memory::InMemoryIndex;
use spec_rag_core::store::{IndexRecord, PathFilter, QueryMatch, StoredChunk, VectorIndex};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    records: Vec<SnapshotRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    id: String,
    text: String,
    metadata: ChunkMetadata,
    vector: SparseVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SparseVector {
    dims: usize,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    fn from_dense(dense: &[f32]) -> Self {
        let (indices, values) = dense
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (i as u32, *v))
            .unzip();
        Self {
            dims: dense.len(),
            indices,
            values,
        }
    }

    fn to_dense(&self) -> Result<Vec<f32>> {
        if self.indices.len() != self.values.len() {
            bail!("sparse vector has mismatched indices and values");
        }
        let mut dense = vec![0.0f32; self.dims];
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            let slot = dense
                .get_mut(i as usize)
                .ok_or_else(|| anyhow::anyhow!("sparse index {} out of range", i))?;
            *slot = v;
        }
        Ok(dense)
    }
}

pub struct FileIndex {
    path: PathBuf,
    inner: InMemoryIndex,
}

impl FileIndex {
    /// An empty index that will be written to `path` on flush.
    pub fn create(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            inner: InMemoryIndex::new(),
        }
    }

    /// Load the snapshot at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::MissingIndex {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read index snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse index snapshot {}", path.display()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            bail!(
                "Unsupported index snapshot version {} in {}",
                snapshot.version,
                path.display()
            );
        }

        let records = snapshot
            .records
            .into_iter()
            .map(|r| {
                Ok(IndexRecord {
                    vector: r.vector.to_dense()?,
                    id: r.id,
                    text: r.text,
                    metadata: r.metadata,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path: path.to_path_buf(),
            inner: InMemoryIndex::from_records(records),
        })
    }

    fn write_snapshot(&self) -> Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            records: self
                .inner
                .records()?
                .into_iter()
                .map(|r| SnapshotRecord {
                    vector: SparseVector::from_dense(&r.vector),
                    id: r.id,
                    text: r.text,
                    metadata: r.metadata,
                })
                .collect(),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string(&snapshot)?;
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for FileIndex {
    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        self.inner.upsert(records).await
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PathFilter>,
    ) -> Result<Vec<QueryMatch>> {
        self.inner.query(vector, k, filter).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }

    async fn chunks(&self, filter: Option<&PathFilter>) -> Result<Vec<StoredChunk>> {
        self.inner.chunks(filter).await
    }

    async fn flush(&self) -> Result<()> {
        self.write_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spec_rag_core::models::chunk_id;
    use tempfile::TempDir;

    fn record(file_path: &str, chunk_index: usize, vector: Vec<f32>) -> IndexRecord {
        IndexRecord {
            id: chunk_id(file_path, chunk_index),
            text: "body".to_string(),
            metadata: ChunkMetadata {
                file_path: file_path.to_string(),
                file_name: file_path.to_string(),
                file_size: 4,
                hash: String::new(),
                title: "Untitled".to_string(),
                sections: Vec::new(),
                chunk_index,
                chunk_total: 1,
                chunk_preview: "body".to_string(),
            },
            vector,
        }
    }

    #[test]
    fn test_sparse_vector_roundtrip_keeps_zeros() {
        let dense = vec![0.0, 0.5, 0.0, 0.0, -1.0];
        let sparse = SparseVector::from_dense(&dense);
        assert_eq!(sparse.indices, vec![1, 4]);
        assert_eq!(sparse.to_dense().unwrap(), dense);
    }

    #[test]
    fn test_sparse_vector_rejects_out_of_range() {
        let sparse = SparseVector {
            dims: 2,
            indices: vec![5],
            values: vec![1.0],
        };
        assert!(sparse.to_dense().is_err());
    }

    #[test]
    fn test_open_missing_is_typed_error() {
        let tmp = TempDir::new().unwrap();
        let err = FileIndex::open(&tmp.path().join("rag_db.json")).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::MissingIndex { .. })
        ));
    }

    #[tokio::test]
    async fn test_nothing_written_before_flush() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rag_db.json");
        let index = FileIndex::create(&path);
        index.upsert(&[record("a.md", 0, vec![1.0])]).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_flush_then_open() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rag/rag_db.json");

        let index = FileIndex::create(&path);
        index
            .upsert(&[record("a.md", 0, vec![0.0, 1.0, 0.0]), record("b.md", 0, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        index.flush().await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = FileIndex::open(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        let matches = reopened.query(&[1.0, 0.0, 0.0], 1, None).await.unwrap();
        assert_eq!(matches[0].id, "b.md_0");
    }

    #[tokio::test]
    async fn test_flush_replaces_previous_snapshot() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rag_db.json");

        let first = FileIndex::create(&path);
        first.upsert(&[record("old.md", 0, vec![1.0])]).await.unwrap();
        first.flush().await.unwrap();

        let second = FileIndex::create(&path);
        second.upsert(&[record("new.md", 0, vec![1.0])]).await.unwrap();
        second.flush().await.unwrap();

        let chunks = FileIndex::open(&path).unwrap().chunks(None).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "new.md_0");
    }
}
