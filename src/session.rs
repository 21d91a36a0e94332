//! Explicitly opened bundle of config, embedder, index, and tokenizer.
//!
//! Every command opens one [`Session`] and passes it down; nothing is
//! cached in globals.

use anyhow::Result;
use std::sync::Arc;

use spec_rag_core::chunk::{Chunker, ChunkingPolicy, Tokenizer};
use spec_rag_core::embedding::Embedder;
use spec_rag_core::error::RagError;
use spec_rag_core::store::VectorIndex;

use crate::config::{BudgetUnit, Config, StoreKind};
use crate::embedding::create_embedder;
use crate::file_store::FileIndex;
use crate::sqlite_store::SqliteIndex;
use crate::tokenizer::TiktokenTokenizer;

pub struct Session {
    pub config: Config,
    pub embedder: Box<dyn Embedder>,
    pub index: Box<dyn VectorIndex>,
    pub tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl Session {
    /// Open a session that will rebuild the index.
    pub async fn open_for_indexing(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let index: Box<dyn VectorIndex> = match config.index.store {
            StoreKind::Sqlite => Box::new(SqliteIndex::create(&config.index.path).await?),
            StoreKind::File => Box::new(FileIndex::create(&config.index.path)),
        };
        let tokenizer = load_tokenizer(&config)?;
        Ok(Self {
            config,
            embedder,
            index,
            tokenizer,
        })
    }

    /// Open a session over an existing index.
    ///
    /// Fails with [`RagError::MissingIndex`] when none has been built.
    /// Corpus-fitted embedders are refitted on the stored chunk texts,
    /// which reproduces the vocabulary used at build time.
    pub async fn open_for_query(config: Config) -> Result<Self> {
        let index = open_index(&config).await?;
        let mut embedder = create_embedder(&config.embedding)?;

        if embedder.requires_fit() {
            let texts: Vec<String> = index
                .chunks(None)
                .await?
                .into_iter()
                .map(|c| c.text)
                .collect();
            if !texts.is_empty() {
                embedder.fit(&texts)?;
            }
        }

        let tokenizer = load_tokenizer(&config)?;
        Ok(Self {
            config,
            embedder,
            index,
            tokenizer,
        })
    }

    pub fn chunker(&self) -> Result<Chunker> {
        let chunking = &self.config.chunking;
        match (chunking.policy, &self.tokenizer) {
            (ChunkingPolicy::Tokens, Some(tokenizer)) => {
                Chunker::tokens(Arc::clone(tokenizer), chunking.chunk_size, chunking.overlap)
            }
            (ChunkingPolicy::Tokens, None) => Err(RagError::InvalidChunking(
                "token chunking requires a tokenizer".to_string(),
            )
            .into()),
            (ChunkingPolicy::Paragraphs, _) => Chunker::paragraphs(chunking.chunk_size),
        }
    }

    /// Size of a text in the configured context budget unit.
    pub fn measure(&self, text: &str) -> usize {
        match (self.config.retrieval.budget_unit, &self.tokenizer) {
            (BudgetUnit::Tokens, Some(tokenizer)) => tokenizer.count(text),
            _ => text.chars().count(),
        }
    }
}

/// Open the configured index read-side, without creating anything.
pub async fn open_index(config: &Config) -> Result<Box<dyn VectorIndex>> {
    Ok(match config.index.store {
        StoreKind::Sqlite => Box::new(SqliteIndex::open(&config.index.path).await?),
        StoreKind::File => Box::new(FileIndex::open(&config.index.path)?),
    })
}

/// Chunks in the existing index, or `None` when there is no index yet.
pub async fn existing_chunk_count(config: &Config) -> Result<Option<usize>> {
    match open_index(config).await {
        Ok(index) => Ok(Some(index.count().await?)),
        Err(e) if is_missing_index(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn is_missing_index(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<RagError>(),
        Some(RagError::MissingIndex { .. })
    )
}

fn load_tokenizer(config: &Config) -> Result<Option<Arc<dyn Tokenizer>>> {
    let needed = config.chunking.policy == ChunkingPolicy::Tokens
        || config.retrieval.budget_unit == BudgetUnit::Tokens;
    if !needed {
        return Ok(None);
    }
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(TiktokenTokenizer::cl100k()?);
    Ok(Some(tokenizer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn lexical_config(dir: &std::path::Path) -> Config {
        let mut config = Config::minimal();
        config.embedding.provider = "tfidf".to_string();
        config.index.store = StoreKind::File;
        config.index.path = dir.join("rag_db.json");
        config.chunking.policy = ChunkingPolicy::Paragraphs;
        config.retrieval.budget_unit = BudgetUnit::Chars;
        config
    }

    #[tokio::test]
    async fn test_query_without_index_is_missing() {
        let tmp = TempDir::new().unwrap();
        let err = Session::open_for_query(lexical_config(tmp.path()))
            .await
            .err()
            .unwrap();
        assert!(is_missing_index(&err));
    }

    #[tokio::test]
    async fn test_existing_count_none_without_index() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(existing_chunk_count(&lexical_config(tmp.path())).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lexical_session_has_no_tokenizer() {
        let tmp = TempDir::new().unwrap();
        let session = Session::open_for_indexing(lexical_config(tmp.path())).await.unwrap();
        assert!(session.tokenizer.is_none());
        assert_eq!(session.chunker().unwrap().policy(), ChunkingPolicy::Paragraphs);
        assert_eq!(session.measure("héllo"), 5);
    }
}
