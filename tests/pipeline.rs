//! Index build pipeline against an in-memory index and a deterministic
//! fake embedder.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

use spec_rag::config::CorpusConfig;
use spec_rag::corpus::{discover, CorpusFile};
use spec_rag::ingest::index_corpus;
use spec_rag::progress::NoProgress;
use spec_rag_core::chunk::Chunker;
use spec_rag_core::embedding::Embedder;
use spec_rag_core::lexical::TfidfEmbedder;
use spec_rag_core::search::{search, SearchRequest};
use spec_rag_core::store::memory::InMemoryIndex;
use spec_rag_core::store::VectorIndex;

/// Embeds text as `[chars, vowels, 1]`; refuses texts containing `EXPLODE`.
struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake"
    }

    fn dims(&self) -> usize {
        3
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| {
                if t.contains("EXPLODE") {
                    bail!("embedding backend rejected input");
                }
                let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                Ok(vec![t.chars().count() as f32, vowels as f32, 1.0])
            })
            .collect()
    }
}

fn corpus(files: &[(&str, &[u8])]) -> (TempDir, Vec<CorpusFile>) {
    let tmp = TempDir::new().unwrap();
    for (rel, content) in files {
        let path = tmp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let config = CorpusConfig {
        specs_dir: tmp.path().to_path_buf(),
        ..CorpusConfig::default()
    };
    let found = discover(&config).unwrap();
    (tmp, found)
}

fn chunker() -> Chunker {
    Chunker::paragraphs(20).unwrap()
}

const TWO_CHUNKS: &[u8] = b"alpha one paragraph\n\nalpha two paragraph";
const THREE_CHUNKS: &[u8] = b"beta one paragraph\n\nbeta two paragraph\n\nbeta three paragraph";

#[tokio::test]
async fn test_chunk_ids_unique_across_files() {
    let (_tmp, files) = corpus(&[("a/x.md", TWO_CHUNKS), ("b/y.md", THREE_CHUNKS)]);
    let index = InMemoryIndex::new();

    let report = index_corpus(&files, &chunker(), &mut FakeEmbedder, &index, &NoProgress)
        .await
        .unwrap();
    assert_eq!(report.chunks_written, 5);
    assert_eq!(report.files_indexed, 2);

    let ids: BTreeSet<String> = index
        .chunks(None)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    let expected: BTreeSet<String> = ["a/x.md_0", "a/x.md_1", "b/y.md_0", "b/y.md_1", "b/y.md_2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_reindex_is_idempotent() {
    let (_tmp, files) = corpus(&[("a/x.md", TWO_CHUNKS), ("b/y.md", THREE_CHUNKS)]);
    let index = InMemoryIndex::new();

    index_corpus(&files, &chunker(), &mut FakeEmbedder, &index, &NoProgress)
        .await
        .unwrap();
    let first = index.records().unwrap();

    index_corpus(&files, &chunker(), &mut FakeEmbedder, &index, &NoProgress)
        .await
        .unwrap();
    assert_eq!(index.records().unwrap(), first);
}

#[tokio::test]
async fn test_failing_files_are_skipped() {
    let (_tmp, files) = corpus(&[
        ("a/x.md", TWO_CHUNKS),
        ("b/broken.md", &[0xffu8, 0xfe, 0x00, 0x80][..]),
        ("c/rejected.md", &b"EXPLODE here"[..]),
        ("d/z.md", THREE_CHUNKS),
    ]);
    let index = InMemoryIndex::new();

    let report = index_corpus(&files, &chunker(), &mut FakeEmbedder, &index, &NoProgress)
        .await
        .unwrap();

    assert_eq!(report.files_found, 4);
    assert_eq!(report.files_indexed, 2);
    let failed: Vec<&str> = report.files_failed.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(failed, vec!["b/broken.md", "c/rejected.md"]);
    assert_eq!(report.indexed_files, vec!["a/x.md", "d/z.md"]);
    assert_eq!(index.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_empty_corpus_leaves_index_untouched() {
    let (_tmp, seeded) = corpus(&[("a/x.md", TWO_CHUNKS)]);
    let index = InMemoryIndex::new();
    index_corpus(&seeded, &chunker(), &mut FakeEmbedder, &index, &NoProgress)
        .await
        .unwrap();

    let report = index_corpus(&[], &chunker(), &mut FakeEmbedder, &index, &NoProgress)
        .await
        .unwrap();
    assert_eq!(report.files_found, 0);
    assert_eq!(index.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_tfidf_is_fitted_before_embedding() {
    let (_tmp, files) = corpus(&[
        ("api/auth.md", &b"# Auth\n\nBearer tokens expire hourly."[..]),
        ("ops/deploy.md", &b"# Deploy\n\nContainers roll out gradually."[..]),
    ]);
    let index = InMemoryIndex::new();
    let mut embedder = TfidfEmbedder::new(Default::default());

    index_corpus(&files, &Chunker::paragraphs(200).unwrap(), &mut embedder, &index, &NoProgress)
        .await
        .unwrap();
    assert!(embedder.is_fitted());

    let hits = search(&embedder, &index, &SearchRequest::new("bearer tokens", 1))
        .await
        .unwrap();
    assert_eq!(hits[0].metadata.file_path, "api/auth.md");
}
