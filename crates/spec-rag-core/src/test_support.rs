//! Fixtures shared by the unit tests of this crate.

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::models::{chunk_id, preview, ChunkMetadata, PREVIEW_CHARS};
use crate::store::IndexRecord;

pub fn metadata(file_path: &str, chunk_index: usize, text: &str) -> ChunkMetadata {
    let file_name = file_path.rsplit('/').next().unwrap_or(file_path).to_string();
    ChunkMetadata {
        file_path: file_path.to_string(),
        file_name,
        file_size: text.len() as u64,
        hash: String::new(),
        title: "Title".to_string(),
        sections: Vec::new(),
        chunk_index,
        chunk_total: chunk_index + 1,
        chunk_preview: preview(text, PREVIEW_CHARS),
    }
}

pub fn record(file_path: &str, chunk_index: usize, vector: Vec<f32>) -> IndexRecord {
    let text = format!("chunk {} of {}", chunk_index, file_path);
    IndexRecord {
        id: chunk_id(file_path, chunk_index),
        metadata: metadata(file_path, chunk_index, &text),
        text,
        vector,
    }
}

/// Maps every text to the same fixed vector.
pub struct ConstantEmbedder(pub Vec<f32>);

#[async_trait]
impl Embedder for ConstantEmbedder {
    fn model_name(&self) -> &str {
        "constant"
    }

    fn dims(&self) -> usize {
        self.0.len()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.0.clone()).collect())
    }
}
