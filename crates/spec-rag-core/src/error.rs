//! Error conditions callers need to tell apart.
//!
//! Everything else is reported through `anyhow::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// A query was attempted before any index was built at `path`.
    #[error("no index found at {path}")]
    MissingIndex { path: String },

    /// A corpus-fitted embedder was asked to embed before `fit` ran.
    #[error("embedder '{model}' has not been fitted on a corpus")]
    NotFitted { model: String },

    #[error("invalid chunking parameters: {0}")]
    InvalidChunking(String),
}
