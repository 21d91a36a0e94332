//! `search` and `context` commands.
//!
//! Thin printing layers over [`spec_rag_core::search`]; ranking, filtering
//! and context packing happen there.

use anyhow::Result;

use spec_rag_core::models::{preview, SearchHit};
use spec_rag_core::search::{context_for_generation, search, SearchRequest};

use crate::config::Config;
use crate::session::Session;

/// Characters of chunk content shown per search result.
const RESULT_PREVIEW_CHARS: usize = 400;

pub async fn run_search(
    config: &Config,
    query: &str,
    file_filter: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let session = Session::open_for_query(config.clone()).await?;
    let req = SearchRequest {
        file_filter,
        min_relevance: config.retrieval.min_relevance,
        ..SearchRequest::new(query, limit.unwrap_or(config.retrieval.max_results))
    };
    let hits = search(session.embedder.as_ref(), session.index.as_ref(), &req).await?;

    print!("{}", render_results(query, file_filter, &hits));
    Ok(())
}

fn render_results(query: &str, file_filter: Option<&str>, hits: &[SearchHit]) -> String {
    let mut out = format!("Search Results for: '{}'\n", query);
    if let Some(filter) = file_filter {
        out.push_str(&format!("Filtered by file: {}\n", filter));
    }
    out.push('\n');

    if hits.is_empty() {
        out.push_str("No results found.\n");
        return out;
    }

    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("--- Result {} ---\n", i + 1));
        out.push_str(&format!("File: {}\n", hit.metadata.file_path));
        out.push_str(&format!("Section: {}\n", hit.metadata.title));
        out.push_str(&format!("Relevance Score: {:.3}\n", hit.relevance_score));
        out.push_str("Content Preview:\n");
        out.push_str(&preview(&hit.content, RESULT_PREVIEW_CHARS));
        out.push_str("\n\n");
    }
    out
}

pub async fn run_context(config: &Config, query: &str, max_budget: Option<usize>) -> Result<()> {
    let session = Session::open_for_query(config.clone()).await?;
    let measure = |text: &str| session.measure(text);

    let context = context_for_generation(
        session.embedder.as_ref(),
        session.index.as_ref(),
        query,
        max_budget.unwrap_or(config.retrieval.max_context_budget),
        config.retrieval.min_relevance,
        &config.retrieval.context_header,
        &measure,
    )
    .await?;

    println!("{}", context);
    Ok(())
}
