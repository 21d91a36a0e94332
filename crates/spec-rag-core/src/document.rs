//! Document preparation: parse, chunk, and attach per-chunk metadata.
//!
//! This is the pure part of indexing. The app crate reads files from disk
//! and hands their contents here; the resulting [`Chunk`]s are ready to be
//! embedded and upserted.

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::chunk::Chunker;
use crate::markdown::parse_markdown;
use crate::models::{chunk_id, preview, Chunk, ChunkMetadata, Document, Section, PREVIEW_CHARS};

impl Document {
    /// Parse a markdown file's contents into a [`Document`].
    pub fn from_markdown(file_path: &str, file_name: &str, content: &str) -> Document {
        let parsed = parse_markdown(content);
        Document {
            file_path: file_path.to_string(),
            file_name: file_name.to_string(),
            content: content.to_string(),
            hash: content_hash(content),
            title: parsed.title,
            sections: parsed.sections,
        }
    }

    /// Size of the raw content in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// SHA-256 of `content`, hex encoded.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split a document into chunks carrying the document metadata.
///
/// Chunk indices are contiguous from 0 and every chunk records the total,
/// so `chunk_total` is identical across a document's chunks. A document
/// with no text produces no chunks.
pub fn chunk_document(doc: &Document, chunker: &Chunker) -> Result<Vec<Chunk>> {
    let pieces = chunker.split(&doc.content)?;
    let total = pieces.len();
    let outline: Vec<Section> = doc.sections.iter().map(Section::heading).collect();

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            id: chunk_id(&doc.file_path, index),
            metadata: ChunkMetadata {
                file_path: doc.file_path.clone(),
                file_name: doc.file_name.clone(),
                file_size: doc.size(),
                hash: doc.hash.clone(),
                title: doc.title.clone(),
                sections: outline.clone(),
                chunk_index: index,
                chunk_total: total,
                chunk_preview: preview(&text, PREVIEW_CHARS),
            },
            text,
        })
        .collect())
}

/// Parse and chunk in one step.
pub fn prepare_document(
    file_path: &str,
    file_name: &str,
    content: &str,
    chunker: &Chunker,
) -> Result<Vec<Chunk>> {
    let doc = Document::from_markdown(file_path, file_name, content);
    chunk_document(&doc, chunker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_metadata() {
        let doc = Document::from_markdown("api/auth.md", "auth.md", "# Auth\n\n## Tokens\n\nBearer.");
        assert_eq!(doc.title, "Auth");
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.hash.len(), 64);
        assert_eq!(doc.size(), 26);
    }

    #[test]
    fn test_chunks_carry_outline_and_ids() {
        let text = "# Auth\n\nFirst paragraph.\n\n## Tokens\n\nSecond paragraph.";
        let chunker = Chunker::paragraphs(20).unwrap();
        let chunks = prepare_document("api/auth.md", "auth.md", text, &chunker).unwrap();

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("api/auth.md_{}", i));
            assert_eq!(chunk.metadata.chunk_index, i);
            assert_eq!(chunk.metadata.chunk_total, chunks.len());
            assert_eq!(chunk.metadata.title, "Auth");
            assert_eq!(chunk.metadata.file_name, "auth.md");
            let titles: Vec<&str> = chunk.metadata.sections.iter().map(|s| s.title.as_str()).collect();
            assert_eq!(titles, vec!["Auth", "Tokens"]);
            assert!(chunk.metadata.sections.iter().all(|s| s.content.is_empty()));
        }
    }

    #[test]
    fn test_preview_truncated() {
        let text = "a".repeat(300);
        let chunker = Chunker::paragraphs(1000).unwrap();
        let chunks = prepare_document("x.md", "x.md", &text, &chunker).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.chunk_preview, format!("{}...", "a".repeat(200)));
    }

    #[test]
    fn test_empty_document_has_no_chunks() {
        let chunker = Chunker::paragraphs(100).unwrap();
        let chunks = prepare_document("empty.md", "empty.md", "", &chunker).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_same_content_same_hash() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }
}
