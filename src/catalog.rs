//! Catalog queries over an existing index: which files are indexed and
//! what each one contributed.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;

use spec_rag_core::store::{PathFilter, VectorIndex};

use crate::config::Config;
use crate::session::open_index;

/// Chunks previewed in a file summary.
const SUMMARY_PREVIEWS: usize = 3;

/// What one indexed file contributed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub file_path: String,
    pub total_chunks: usize,
    /// Distinct document titles carried by the file's chunks, first seen
    /// first.
    pub sections: Vec<String>,
    pub content_preview: String,
}

/// Sorted unique paths of every indexed file.
pub async fn list_indexed_files(index: &dyn VectorIndex) -> Result<Vec<String>> {
    let paths: BTreeSet<String> = index
        .chunks(None)
        .await?
        .into_iter()
        .map(|c| c.metadata.file_path)
        .collect();
    Ok(paths.into_iter().collect())
}

/// Summary of the file at exactly `file_path`, or `None` if it has no
/// chunks in the index.
pub async fn file_summary(index: &dyn VectorIndex, file_path: &str) -> Result<Option<FileSummary>> {
    let mut chunks = index
        .chunks(Some(&PathFilter::Exact(file_path.to_string())))
        .await?;
    if chunks.is_empty() {
        return Ok(None);
    }
    chunks.sort_by_key(|c| c.metadata.chunk_index);

    let mut sections: Vec<String> = Vec::new();
    for chunk in &chunks {
        if !sections.contains(&chunk.metadata.title) {
            sections.push(chunk.metadata.title.clone());
        }
    }
    let content_preview = chunks
        .iter()
        .take(SUMMARY_PREVIEWS)
        .map(|c| c.metadata.chunk_preview.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Some(FileSummary {
        file_path: file_path.to_string(),
        total_chunks: chunks.len(),
        sections,
        content_preview,
    }))
}

pub async fn run_files(config: &Config) -> Result<()> {
    let index = open_index(config).await?;
    let files = list_indexed_files(index.as_ref()).await?;

    println!("Indexed Files:");
    for path in &files {
        println!("  - {}", path);
    }
    Ok(())
}

pub async fn run_file_summary(config: &Config, file_path: &str) -> Result<()> {
    let index = open_index(config).await?;
    let body = match file_summary(index.as_ref(), file_path).await? {
        Some(summary) => serde_json::to_value(&summary)?,
        None => serde_json::json!({ "error": format!("No content found for file: {}", file_path) }),
    };
    println!("File Summary for {}:", file_path);
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spec_rag_core::document::prepare_document;
    use spec_rag_core::chunk::Chunker;
    use spec_rag_core::models::{chunk_id, ChunkMetadata};
    use spec_rag_core::store::memory::InMemoryIndex;
    use spec_rag_core::store::IndexRecord;

    async fn indexed(files: &[(&str, &str)]) -> InMemoryIndex {
        let chunker = Chunker::paragraphs(40).unwrap();
        let index = InMemoryIndex::new();
        for (path, content) in files {
            let name = path.rsplit('/').next().unwrap();
            let records: Vec<IndexRecord> = prepare_document(path, name, content, &chunker)
                .unwrap()
                .into_iter()
                .map(|c| IndexRecord {
                    id: c.id,
                    text: c.text,
                    metadata: c.metadata,
                    vector: vec![1.0],
                })
                .collect();
            index.upsert(&records).await.unwrap();
        }
        index
    }

    #[tokio::test]
    async fn test_list_sorted_unique() {
        let index = indexed(&[
            ("b/y.md", "# Y\n\nfirst paragraph here\n\nsecond paragraph here"),
            ("a/x.md", "# X\n\nbody"),
        ])
        .await;
        assert_eq!(list_indexed_files(&index).await.unwrap(), vec!["a/x.md", "b/y.md"]);
    }

    #[tokio::test]
    async fn test_file_summary_exact_match() {
        let index = indexed(&[
            ("api/auth.md", "# Auth\n\n## Tokens\n\nBearer tokens only.\n\n## Scopes\n\nRead and write."),
            ("api/auth.md.bak", "# Old\n\nstale"),
        ])
        .await;

        let summary = file_summary(&index, "api/auth.md").await.unwrap().unwrap();
        assert_eq!(summary.file_path, "api/auth.md");
        assert_eq!(summary.sections, vec!["Auth"]);
        assert!(summary.total_chunks >= 2);
        assert!(summary.content_preview.starts_with("# Auth"));
        assert!(summary.content_preview.lines().count() >= summary.total_chunks.min(SUMMARY_PREVIEWS));
    }

    #[tokio::test]
    async fn test_file_summary_absent() {
        let index = indexed(&[("a/x.md", "# X\n\nbody")]).await;
        assert!(file_summary(&index, "a/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_summary_sections_are_unique_titles() {
        let index = InMemoryIndex::new();
        let mut records = Vec::new();
        for (i, title) in ["Guide", "Guide", "Appendix", "Guide"].iter().enumerate() {
            records.push(IndexRecord {
                id: chunk_id("g.md", i),
                text: format!("part {}", i),
                metadata: ChunkMetadata {
                    file_path: "g.md".to_string(),
                    file_name: "g.md".to_string(),
                    file_size: 24,
                    hash: String::new(),
                    title: title.to_string(),
                    sections: Vec::new(),
                    chunk_index: i,
                    chunk_total: 4,
                    chunk_preview: format!("part {}", i),
                },
                vector: vec![1.0],
            });
        }
        index.upsert(&records).await.unwrap();

        let summary = file_summary(&index, "g.md").await.unwrap().unwrap();
        assert_eq!(summary.total_chunks, 4);
        assert_eq!(summary.sections, vec!["Guide", "Appendix"]);
    }
}
