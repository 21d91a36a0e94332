//! # spec-rag core
//!
//! Shared, WASM-safe logic for spec-rag: data models, markdown parsing,
//! chunking, the embedder and vector-index traits, the TF-IDF vectorizer,
//! and the retrieval/context-packing algorithm.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Concrete embedders and persistent indexes
//! live in the `spec-rag` app crate.

pub mod chunk;
pub mod document;
pub mod embedding;
pub mod error;
pub mod lexical;
pub mod markdown;
pub mod models;
pub mod search;
pub mod store;

#[cfg(test)]
mod test_support;
