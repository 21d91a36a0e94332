//! # spec-rag
//!
//! Retrieval over a folder of markdown specifications.
//!
//! spec-rag parses every markdown file under a specs directory, splits it
//! into token windows or paragraph packs, embeds the chunks, and stores
//! them in a vector index. Queries come back as ranked hits or as a
//! budget-bounded context string ready to paste into a prompt.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌────────────────┐
//! │ specs/**.md │──▶│ Parse+Chunk+Embed │──▶│ SQLite / JSON  │
//! └─────────────┘   └──────────────────┘   └───────┬────────┘
//!                                                  │
//!                                                  ▼
//!                                   ┌──────────────────────────┐
//!                                   │ search / context / stats │
//!                                   └──────────────────────────┘
//! ```
//!
//! Retrieval, chunking and markdown parsing live in `spec-rag-core`; this
//! crate adds the filesystem, storage backends, embedding providers and
//! the `specrag` CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! specrag index --specs-dir ./specs
//! specrag search "token refresh" --file api/
//! specrag context "how are tokens refreshed?" --max-budget 2000
//! specrag stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | Markdown file discovery |
//! | [`ingest`] | Index build pipeline |
//! | [`search`] | `search` and `context` commands |
//! | [`catalog`] | Indexed file listing and summaries |
//! | [`stats`] | Index statistics |
//! | [`embedding`] | Embedding provider construction |
//! | [`sqlite_store`] | SQLite vector index |
//! | [`file_store`] | JSON snapshot vector index |
//! | [`session`] | Explicit config/embedder/index bundle |

pub mod catalog;
pub mod config;
pub mod corpus;
pub mod db;
pub mod embedding;
pub mod export;
pub mod file_store;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod search;
pub mod session;
pub mod sqlite_store;
pub mod stats;
pub mod tokenizer;
