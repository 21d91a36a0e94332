//! In-memory [`VectorIndex`] for tests and embedding in other programs.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, in insertion order.
//! Queries are brute-force cosine distance over every stored vector.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;

use super::{nearest, IndexRecord, PathFilter, QueryMatch, StoredChunk, VectorIndex};

#[derive(Default)]
pub struct InMemoryIndex {
    records: RwLock<Vec<IndexRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index pre-filled with `records`, e.g. from a loaded snapshot.
    pub fn from_records(records: Vec<IndexRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Copy of every stored record, in insertion order.
    pub fn records(&self) -> Result<Vec<IndexRecord>> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<IndexRecord>>> {
        self.records
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<IndexRecord>>> {
        self.records
            .write()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        let mut stored = self.write()?;
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PathFilter>,
    ) -> Result<Vec<QueryMatch>> {
        let stored = self.read()?;
        let candidates = stored
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata.file_path)))
            .map(|r| (cosine_distance(vector, &r.vector), r));

        Ok(nearest(candidates, k)
            .into_iter()
            .map(|(distance, r)| QueryMatch {
                id: r.id.clone(),
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                distance,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn chunks(&self, filter: Option<&PathFilter>) -> Result<Vec<StoredChunk>> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata.file_path)))
            .map(|r| StoredChunk {
                id: r.id.clone(),
                text: r.text.clone(),
                metadata: r.metadata.clone(),
            })
            .collect())
    }
}
