//! Similarity search and context packing.
//!
//! The retrieval algorithm operates entirely through the [`Embedder`] and
//! [`VectorIndex`] traits, with no database or configuration dependencies.
//!
//! # Search
//!
//! 1. Embed the query.
//! 2. Fetch the `max_results` nearest chunks from the whole index.
//! 3. Relevance = `1 - distance`; drop hits at or below the optional floor.
//! 4. Sort by relevance (desc), then id (asc), and truncate.
//! 5. Apply the file filter (path substring) to that list. The result may
//!    shrink below `max_results`; the index is not re-queried.
//!
//! # Context packing
//!
//! [`context_for_generation`] over-fetches [`CONTEXT_CANDIDATES`] hits and
//! appends one formatted block per hit after a header while the running
//! size stays within the budget. Packing stops at the first block that
//! does not fit; later, smaller blocks are not tried.

use std::cmp::Ordering;

use anyhow::Result;

use crate::embedding::Embedder;
use crate::models::SearchHit;
use crate::store::{PathFilter, VectorIndex};

/// Candidates fetched for context packing.
pub const CONTEXT_CANDIDATES: usize = 10;

pub const DEFAULT_CONTEXT_HEADER: &str = "CONTEXT FROM SPECIFICATIONS:";

const RULE_WIDTH: usize = 50;

/// Inputs of a single [`search`] call.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub max_results: usize,
    /// Keep only hits whose file path contains this substring.
    pub file_filter: Option<&'a str>,
    /// Drop hits whose relevance is at or below this value.
    pub min_relevance: Option<f64>,
}

impl<'a> SearchRequest<'a> {
    pub fn new(query: &'a str, max_results: usize) -> Self {
        Self {
            query,
            max_results,
            file_filter: None,
            min_relevance: None,
        }
    }
}

/// Ranked nearest chunks for a query.
///
/// Returns an empty list for a blank query, `max_results == 0`, or an
/// empty index.
pub async fn search<E, I>(embedder: &E, index: &I, req: &SearchRequest<'_>) -> Result<Vec<SearchHit>>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    if req.query.trim().is_empty() || req.max_results == 0 {
        return Ok(Vec::new());
    }
    if index.count().await? == 0 {
        return Ok(Vec::new());
    }

    let vectors = embedder.embed(&[req.query.to_string()]).await?;
    let Some(query_vec) = vectors.into_iter().next() else {
        return Ok(Vec::new());
    };

    let matches = index.query(&query_vec, req.max_results, None).await?;
    let mut hits: Vec<SearchHit> = matches
        .into_iter()
        .map(|m| SearchHit {
            id: m.id,
            content: m.text,
            metadata: m.metadata,
            distance: m.distance,
            relevance_score: 1.0 - m.distance,
        })
        .filter(|hit| req.min_relevance.map_or(true, |floor| hit.relevance_score > floor))
        .collect();

    hits.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(req.max_results);

    if let Some(needle) = req.file_filter {
        let filter = PathFilter::Contains(needle.to_string());
        hits.retain(|hit| filter.matches(&hit.metadata.file_path));
    }

    tracing::debug!(query = req.query, hits = hits.len(), "search complete");
    Ok(hits)
}

/// Render one hit as a context block.
pub fn format_context_block(hit: &SearchHit) -> String {
    format!(
        "\n--- From {} ---\nSection: {}\nRelevance: {:.2}\nContent:\n{}\n",
        hit.metadata.file_path, hit.metadata.title, hit.relevance_score, hit.content
    )
}

/// Pack `hits` into a context string of at most `max_budget` units.
///
/// `measure` gives the size of a piece of text in budget units (tokens or
/// characters). The header and its rule always appear, even when they
/// alone exceed the budget.
pub fn pack_context(
    header: &str,
    hits: &[SearchHit],
    max_budget: usize,
    measure: &dyn Fn(&str) -> usize,
) -> String {
    let mut parts = vec![header.to_string(), "=".repeat(RULE_WIDTH)];
    let mut used = measure(&parts.join("\n"));

    for hit in hits {
        let block = format_context_block(hit);
        let size = measure(&block);
        if used + size > max_budget {
            break;
        }
        used += size;
        parts.push(block);
    }

    parts.join("\n")
}

/// Retrieve candidates for `query` and pack them into a context string.
pub async fn context_for_generation<E, I>(
    embedder: &E,
    index: &I,
    query: &str,
    max_budget: usize,
    min_relevance: Option<f64>,
    header: &str,
    measure: &dyn Fn(&str) -> usize,
) -> Result<String>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    let req = SearchRequest {
        min_relevance,
        ..SearchRequest::new(query, CONTEXT_CANDIDATES)
    };
    let hits = search(embedder, index, &req).await?;
    Ok(pack_context(header, &hits, max_budget, measure))
}
