//! Configuration: TOML file, defaults, and validation.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all, via [`Config::minimal`]) describes the neural deployment: local
//! all-MiniLM-L6-v2 embeddings, token-window chunks, SQLite index.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use spec_rag_core::chunk::ChunkingPolicy;
use spec_rag_core::lexical::TfidfOptions;
use spec_rag_core::search::DEFAULT_CONTEXT_HEADER;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_specs_dir")]
    pub specs_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            specs_dir: default_specs_dir(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_specs_dir() -> PathBuf {
    PathBuf::from("specs")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

/// Persistent index backend.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// SQLite database with vectors as BLOBs.
    Sqlite,
    /// Flat JSON snapshot, replaced wholesale on every build.
    File,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_store")]
    pub store: StoreKind,
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    /// Where the build summary is written. Defaults to
    /// `index_summary.json` next to the index.
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            path: default_index_path(),
            summary_path: None,
        }
    }
}

fn default_store() -> StoreKind {
    StoreKind::Sqlite
}
fn default_index_path() -> PathBuf {
    PathBuf::from("docs/rag/specs.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_policy")]
    pub policy: ChunkingPolicy,
    /// Tokens per window, or characters per packed chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Tokens shared by consecutive windows. Ignored by paragraph packing.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_policy() -> ChunkingPolicy {
    ChunkingPolicy::Tokens
}
fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `local`, `openai`, `ollama`, or `tfidf`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL of the Ollama server.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tfidf: TfidfConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
            tfidf: TfidfConfig::default(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct TfidfConfig {
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_max_df")]
    pub max_df: f64,
    #[serde(default = "default_bigrams")]
    pub bigrams: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            max_df: default_max_df(),
            bigrams: default_bigrams(),
        }
    }
}

impl TfidfConfig {
    pub fn options(&self) -> TfidfOptions {
        TfidfOptions {
            max_features: self.max_features,
            max_df: self.max_df,
            bigrams: self.bigrams,
        }
    }
}

fn default_max_features() -> usize {
    5000
}
fn default_max_df() -> f64 {
    0.95
}
fn default_bigrams() -> bool {
    true
}

/// Unit in which the context budget is measured.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BudgetUnit {
    /// cl100k_base tokens.
    Tokens,
    Chars,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_context_budget")]
    pub max_context_budget: usize,
    #[serde(default = "default_budget_unit")]
    pub budget_unit: BudgetUnit,
    /// Hits with relevance at or below this value are dropped.
    #[serde(default)]
    pub min_relevance: Option<f64>,
    #[serde(default = "default_context_header")]
    pub context_header: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            max_context_budget: default_max_context_budget(),
            budget_unit: default_budget_unit(),
            min_relevance: None,
            context_header: default_context_header(),
        }
    }
}

fn default_max_results() -> usize {
    5
}
fn default_max_context_budget() -> usize {
    4000
}
fn default_budget_unit() -> BudgetUnit {
    BudgetUnit::Tokens
}
fn default_context_header() -> String {
    DEFAULT_CONTEXT_HEADER.to_string()
}

impl Config {
    /// Defaults used when no config file is given.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn summary_path(&self) -> PathBuf {
        match &self.index.summary_path {
            Some(path) => path.clone(),
            None => self
                .index
                .path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("index_summary.json"),
        }
    }

    /// Check cross-field constraints. Run after every load or override.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.policy == ChunkingPolicy::Tokens
            && self.chunking.overlap >= self.chunking.chunk_size
        {
            bail!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.overlap,
                self.chunking.chunk_size
            );
        }

        if self.retrieval.max_results < 1 {
            bail!("retrieval.max_results must be >= 1");
        }
        if self.retrieval.max_context_budget == 0 {
            bail!("retrieval.max_context_budget must be > 0");
        }

        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        match self.embedding.provider.as_str() {
            "local" | "openai" | "ollama" => {}
            "tfidf" => {
                let tfidf = &self.embedding.tfidf;
                if tfidf.max_features == 0 {
                    bail!("embedding.tfidf.max_features must be > 0");
                }
                if !(tfidf.max_df > 0.0 && tfidf.max_df <= 1.0) {
                    bail!("embedding.tfidf.max_df must be in (0.0, 1.0]");
                }
            }
            other => bail!(
                "Unknown embedding provider: '{}'. Must be local, openai, ollama, or tfidf.",
                other
            ),
        }
        if self.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0 when set");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}
