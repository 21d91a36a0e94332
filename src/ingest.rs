//! Index build pipeline.
//!
//! Coordinates a full rebuild: discover → prepare every file (read, parse,
//! chunk) → fit the embedder on all chunk texts → clear the index → embed
//! and upsert file by file → flush. A file that fails at any step is
//! logged, counted, and skipped; the rest of the build continues. There
//! is no rollback.

use anyhow::{bail, Context, Result};

use spec_rag_core::chunk::Chunker;
use spec_rag_core::document::prepare_document;
use spec_rag_core::embedding::Embedder;
use spec_rag_core::models::Chunk;
use spec_rag_core::store::{IndexRecord, VectorIndex};

use crate::config::Config;
use crate::corpus::{self, CorpusFile};
use crate::export;
use crate::progress::{IndexProgressEvent, IndexProgressReporter, ProgressMode};
use crate::session::{existing_chunk_count, Session};

/// Outcome of an index build.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndexReport {
    pub files_found: usize,
    pub files_indexed: usize,
    /// `(relative path, error message)` per skipped file.
    pub files_failed: Vec<(String, String)>,
    pub chunks_written: usize,
    /// Paths that contributed at least one chunk, sorted.
    pub indexed_files: Vec<String>,
}

struct PreparedFile {
    relative_path: String,
    chunks: Vec<Chunk>,
}

/// Rebuild `index` from `files`.
///
/// An empty file list is a no-op: nothing is cleared or written.
pub async fn index_corpus(
    files: &[CorpusFile],
    chunker: &Chunker,
    embedder: &mut dyn Embedder,
    index: &dyn VectorIndex,
    progress: &dyn IndexProgressReporter,
) -> Result<IndexReport> {
    let mut report = IndexReport {
        files_found: files.len(),
        ..IndexReport::default()
    };
    if files.is_empty() {
        tracing::warn!("no markdown files found; index left untouched");
        return Ok(report);
    }

    let mut prepared = Vec::with_capacity(files.len());
    for file in files {
        match prepare_file(file, chunker) {
            Ok(chunks) => prepared.push(PreparedFile {
                relative_path: file.relative_path.clone(),
                chunks,
            }),
            Err(e) => record_failure(&mut report, &file.relative_path, &e),
        }
    }

    if embedder.requires_fit() {
        let corpus: Vec<String> = prepared
            .iter()
            .flat_map(|p| p.chunks.iter().map(|c| c.text.clone()))
            .collect();
        embedder.fit(&corpus).context("Failed to fit embedder on corpus")?;
    }

    index.clear().await.context("Failed to clear index")?;

    let total = prepared.len() as u64;
    for (n, file) in prepared.iter().enumerate() {
        match store_file(file, &*embedder, index).await {
            Ok(written) => {
                report.files_indexed += 1;
                report.chunks_written += written;
                if written > 0 {
                    report.indexed_files.push(file.relative_path.clone());
                }
                tracing::info!(file = %file.relative_path, chunks = written, "indexed");
            }
            Err(e) => record_failure(&mut report, &file.relative_path, &e),
        }
        progress.report(IndexProgressEvent::Indexing {
            n: n as u64 + 1,
            total,
            file: file.relative_path.clone(),
        });
    }

    index.flush().await.context("Failed to persist index")?;
    report.indexed_files.sort();
    Ok(report)
}

fn prepare_file(file: &CorpusFile, chunker: &Chunker) -> Result<Vec<Chunk>> {
    let content = file.read()?;
    prepare_document(&file.relative_path, &file.file_name, &content, chunker)
}

async fn store_file(
    file: &PreparedFile,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
) -> Result<usize> {
    if file.chunks.is_empty() {
        return Ok(0);
    }

    let texts: Vec<String> = file.chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != texts.len() {
        bail!(
            "embedder returned {} vectors for {} chunks",
            vectors.len(),
            texts.len()
        );
    }

    let records: Vec<IndexRecord> = file
        .chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexRecord {
            id: chunk.id.clone(),
            text: chunk.text.clone(),
            metadata: chunk.metadata.clone(),
            vector,
        })
        .collect();
    index.upsert(&records).await?;
    Ok(records.len())
}

fn record_failure(report: &mut IndexReport, path: &str, err: &anyhow::Error) {
    tracing::warn!(file = %path, error = %format!("{:#}", err), "skipping file");
    report
        .files_failed
        .push((path.to_string(), format!("{:#}", err)));
}

/// The `index` command.
///
/// Builds when `rebuild` is set or no populated index exists; otherwise
/// reports the existing chunk count.
pub async fn run_index(config: &Config, rebuild: bool, progress_mode: ProgressMode) -> Result<()> {
    if !rebuild {
        if let Some(count) = existing_chunk_count(config).await?.filter(|&c| c > 0) {
            println!(
                "Index already contains {} chunks at {}",
                count,
                config.index.path.display()
            );
            println!("Use --rebuild to rebuild it.");
            return Ok(());
        }
    }

    let reporter = progress_mode.reporter();
    reporter.report(IndexProgressEvent::Discovering {
        root: config.corpus.specs_dir.display().to_string(),
    });
    let files = corpus::discover(&config.corpus)?;

    if files.is_empty() {
        println!(
            "No markdown files found in {}",
            config.corpus.specs_dir.display()
        );
        return Ok(());
    }

    let mut session = Session::open_for_indexing(config.clone()).await?;
    let chunker = session.chunker()?;
    let report = index_corpus(
        &files,
        &chunker,
        session.embedder.as_mut(),
        session.index.as_ref(),
        reporter.as_ref(),
    )
    .await?;

    let summary = export::IndexSummary::from_report(&report, config, session.embedder.model_name());
    let summary_path = config.summary_path();
    export::write_summary(&summary, &summary_path)?;

    println!("index {}", config.corpus.specs_dir.display());
    println!("  files found:    {}", report.files_found);
    println!("  files indexed:  {}", report.files_indexed);
    println!("  files failed:   {}", report.files_failed.len());
    for (path, message) in &report.files_failed {
        println!("    {}: {}", path, message);
    }
    println!("  chunks written: {}", report.chunks_written);
    println!("  index:          {}", config.index.path.display());
    println!("  summary:        {}", summary_path.display());
    println!("ok");

    Ok(())
}
