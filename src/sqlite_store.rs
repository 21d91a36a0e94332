//! SQLite-backed [`VectorIndex`].
//!
//! One row per chunk: text, metadata as JSON, and the vector as a
//! little-endian `f32` BLOB. Similarity is brute-force cosine distance in
//! Rust over every row, which is plenty for a folder of specifications.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

use spec_rag_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use spec_rag_core::models::ChunkMetadata;
use spec_rag_core::store::{
    nearest, IndexRecord, PathFilter, QueryMatch, StoredChunk, VectorIndex,
};

use crate::db;
use crate::migrate::run_migrations;

pub struct SqliteIndex {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteIndex {
    /// Open or create the database at `path` for writing.
    pub async fn create(path: &Path) -> Result<Self> {
        let pool = db::connect(path, true).await?;
        run_migrations(&pool).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing database; fails with `RagError::MissingIndex` if
    /// there is none.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path, false).await?;
        run_migrations(&pool).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    async fn load_records(&self, filter: Option<&PathFilter>) -> Result<Vec<IndexRecord>> {
        let rows = sqlx::query(
            "SELECT id, file_path, text, metadata_json, embedding FROM chunks ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .filter(|row| {
                let file_path: String = row.get("file_path");
                filter.map_or(true, |f| f.matches(&file_path))
            })
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let (id, text, metadata) = decode_chunk(row)?;
                Ok(IndexRecord {
                    id,
                    text,
                    metadata,
                    vector: blob_to_vec(&blob),
                })
            })
            .collect()
    }
}

fn decode_chunk(row: &SqliteRow) -> Result<(String, String, ChunkMetadata)> {
    let id: String = row.get("id");
    let text: String = row.get("text");
    let metadata_json: String = row.get("metadata_json");
    let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)
        .with_context(|| format!("Corrupt metadata for chunk {}", id))?;
    Ok((id, text, metadata))
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM chunks").execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO chunks (id, file_path, chunk_index, text, metadata_json, embedding, dims)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    file_path = excluded.file_path,
                    chunk_index = excluded.chunk_index,
                    text = excluded.text,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding,
                    dims = excluded.dims
                "#,
            )
            .bind(&record.id)
            .bind(&record.metadata.file_path)
            .bind(record.metadata.chunk_index as i64)
            .bind(&record.text)
            .bind(&metadata_json)
            .bind(vec_to_blob(&record.vector))
            .bind(record.vector.len() as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PathFilter>,
    ) -> Result<Vec<QueryMatch>> {
        let records = self.load_records(filter).await?;
        let scored = records.iter().map(|r| (cosine_distance(vector, &r.vector), r));

        Ok(nearest(scored, k)
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
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn chunks(&self, filter: Option<&PathFilter>) -> Result<Vec<StoredChunk>> {
        let rows = match filter {
            Some(PathFilter::Exact(path)) => {
                sqlx::query(
                    "SELECT id, text, metadata_json FROM chunks WHERE file_path = ? ORDER BY rowid",
                )
                .bind(path)
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                sqlx::query("SELECT id, file_path, text, metadata_json FROM chunks ORDER BY rowid")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut chunks = Vec::with_capacity(rows.len());
        for row in &rows {
            let (id, text, metadata) = decode_chunk(row)?;
            if filter.map_or(true, |f| f.matches(&metadata.file_path)) {
                chunks.push(StoredChunk { id, text, metadata });
            }
        }
        Ok(chunks)
    }

    /// Fold the write-ahead log into the main database file.
    async fn flush(&self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        tracing::debug!(path = %self.path.display(), "checkpointed index database");
        Ok(())
    }
}
