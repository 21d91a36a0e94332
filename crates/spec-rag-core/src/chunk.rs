//! Text chunking policies.
//!
//! Two policies split a document body into retrieval-sized fragments:
//!
//! - **Token windows** ([`chunk_by_tokens`]): windows of `size` tokens at
//!   offsets `0, size - overlap, 2 * (size - overlap), …`, stopping at the
//!   window that reaches the end of the token sequence. Consecutive windows
//!   share `overlap` tokens, so the windows cover the input with no gaps.
//!   Edges that would split a multi-byte character are moved to the nearest
//!   character boundary, never inward past text the previous window missed.
//! - **Paragraph packing** ([`chunk_by_paragraphs`]): paragraphs (split on
//!   `\n\n`) are accumulated into a buffer until adding the next one would
//!   exceed `max_chars`. Oversized paragraphs are hard-split at the nearest
//!   newline or space boundary, so every chunk stays within `max_chars`.
//!
//! Both policies return zero chunks for empty or whitespace-only input.
//!
//! # Example
//!
//! ```rust
//! use spec_rag_core::chunk::chunk_by_paragraphs;
//!
//! let chunks = chunk_by_paragraphs("Hello world.\n\nSecond paragraph.", 700);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0], "Hello world.\n\nSecond paragraph.");
//! ```

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Separator placed between packed paragraphs.
const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// A reversible text tokenizer.
///
/// `decode` may fail for token runs that end or begin inside a multi-byte
/// character.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    fn decode(&self, tokens: &[u32]) -> Result<String>;

    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// Which splitting strategy a [`Chunker`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingPolicy {
    Tokens,
    Paragraphs,
}

impl ChunkingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingPolicy::Tokens => "tokens",
            ChunkingPolicy::Paragraphs => "paragraphs",
        }
    }
}

impl fmt::Display for ChunkingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured chunking policy.
#[derive(Clone)]
pub struct Chunker {
    policy: ChunkingPolicy,
    size: usize,
    overlap: usize,
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl fmt::Debug for Chunker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunker")
            .field("policy", &self.policy)
            .field("size", &self.size)
            .field("overlap", &self.overlap)
            .finish()
    }
}

impl Chunker {
    /// Token windows of `size` tokens overlapping by `overlap` tokens.
    ///
    /// Fails unless `0 <= overlap < size`.
    pub fn tokens(tokenizer: Arc<dyn Tokenizer>, size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(RagError::InvalidChunking("chunk size must be > 0".to_string()).into());
        }
        if overlap >= size {
            return Err(RagError::InvalidChunking(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            ))
            .into());
        }
        Ok(Self {
            policy: ChunkingPolicy::Tokens,
            size,
            overlap,
            tokenizer: Some(tokenizer),
        })
    }

    /// Paragraph packing into chunks of at most `max_chars` characters.
    pub fn paragraphs(max_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(RagError::InvalidChunking("chunk size must be > 0".to_string()).into());
        }
        Ok(Self {
            policy: ChunkingPolicy::Paragraphs,
            size: max_chars,
            overlap: 0,
            tokenizer: None,
        })
    }

    pub fn policy(&self) -> ChunkingPolicy {
        self.policy
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        match (&self.policy, &self.tokenizer) {
            (ChunkingPolicy::Tokens, Some(tokenizer)) => {
                Ok(chunk_by_tokens(tokenizer.as_ref(), text, self.size, self.overlap))
            }
            (ChunkingPolicy::Tokens, None) => Err(RagError::InvalidChunking(
                "token chunking requires a tokenizer".to_string(),
            )
            .into()),
            (ChunkingPolicy::Paragraphs, _) => Ok(chunk_by_paragraphs(text, self.size)),
        }
    }
}

/// Window ranges over a sequence of `total` tokens.
///
/// Returns no windows when `total` is zero or the parameters are invalid
/// (`size == 0` or `overlap >= size`).
pub fn token_windows(total: usize, size: usize, overlap: usize) -> Vec<Range<usize>> {
    let mut windows = Vec::new();
    if total == 0 || size == 0 || overlap >= size {
        return windows;
    }

    let step = size - overlap;
    let mut start = 0;
    loop {
        let end = (start + size).min(total);
        windows.push(start..end);
        if end == total {
            break;
        }
        start += step;
    }
    windows
}

/// Split `text` into overlapping token windows and decode each window.
///
/// Windows follow [`token_windows`] as long as every edge falls on a
/// character boundary. An end edge inside a multi-byte character is pushed
/// forward until the window decodes, and the next window then starts
/// `overlap` tokens before that widened end, moved back to the nearest
/// boundary. Consecutive chunks therefore always meet or overlap, and with
/// `overlap == 0` they concatenate to exactly `text`.
pub fn chunk_by_tokens(
    tokenizer: &dyn Tokenizer,
    text: &str,
    size: usize,
    overlap: usize,
) -> Vec<String> {
    let mut chunks = Vec::new();
    if text.trim().is_empty() || size == 0 || overlap >= size {
        return chunks;
    }

    let tokens = tokenizer.encode(text);
    let total = tokens.len();
    // `start` is always a decodable boundary; `nominal` is where the
    // schedule wanted the window to begin.
    let mut start = 0;
    let mut nominal = 0;
    while start < total {
        let target = (nominal + size).min(total);
        let Some((end, chunk)) = decode_forward(tokenizer, &tokens, start, target) else {
            tracing::warn!(start, total, "token run does not decode; dropping the tail");
            break;
        };
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        if end == total {
            break;
        }
        nominal = end - overlap;
        start = boundary_at_or_before(tokenizer, &tokens, nominal, start, end);
    }
    chunks
}

/// Smallest `end >= target` for which `tokens[start..end]` decodes.
fn decode_forward(
    tokenizer: &dyn Tokenizer,
    tokens: &[u32],
    start: usize,
    target: usize,
) -> Option<(usize, String)> {
    (target..=tokens.len()).find_map(|end| {
        tokenizer
            .decode(&tokens[start..end])
            .ok()
            .map(|text| (end, text))
    })
}

/// Latest boundary in `(floor, at]` that decodes up to the known boundary
/// `end`, falling forward to the first one in `(at, end]`.
fn boundary_at_or_before(
    tokenizer: &dyn Tokenizer,
    tokens: &[u32],
    at: usize,
    floor: usize,
    end: usize,
) -> usize {
    let decodes = |from: usize| from == end || tokenizer.decode(&tokens[from..end]).is_ok();
    ((floor + 1)..=at)
        .rev()
        .find(|&from| decodes(from))
        .or_else(|| ((at.max(floor) + 1)..=end).find(|&from| decodes(from)))
        .unwrap_or(end)
}

/// Pack paragraphs into chunks of at most `max_chars` characters.
///
/// Lengths are counted in characters, with a 2-character separator
/// between packed paragraphs. The buffer is flushed before it would
/// overflow, never after.
pub fn chunk_by_paragraphs(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    if max_chars == 0 {
        return chunks;
    }

    let normalized = text.replace("\r\n", "\n");
    let mut buf = String::new();
    let mut buf_chars = 0;

    for para in normalized.split(PARAGRAPH_SEPARATOR) {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }
        let para_chars = trimmed.chars().count();

        if para_chars > max_chars {
            flush(&mut chunks, &mut buf, &mut buf_chars);
            split_oversized(trimmed, max_chars, &mut chunks);
            continue;
        }

        let would_be = if buf.is_empty() {
            para_chars
        } else {
            buf_chars + PARAGRAPH_SEPARATOR.len() + para_chars
        };
        if would_be > max_chars {
            flush(&mut chunks, &mut buf, &mut buf_chars);
        }

        if !buf.is_empty() {
            buf.push_str(PARAGRAPH_SEPARATOR);
            buf_chars += PARAGRAPH_SEPARATOR.len();
        }
        buf.push_str(trimmed);
        buf_chars += para_chars;
    }

    flush(&mut chunks, &mut buf, &mut buf_chars);
    chunks
}

fn flush(chunks: &mut Vec<String>, buf: &mut String, buf_chars: &mut usize) {
    if !buf.is_empty() {
        chunks.push(std::mem::take(buf));
    }
    *buf_chars = 0;
}

/// Hard-split a paragraph longer than `max_chars` at the last newline or
/// space inside each `max_chars` window, or exactly at the limit when the
/// window has none.
fn split_oversized(para: &str, max_chars: usize, chunks: &mut Vec<String>) {
    let mut remaining = para;
    while !remaining.is_empty() {
        let limit = match remaining.char_indices().nth(max_chars) {
            Some((idx, _)) => idx,
            None => {
                let piece = remaining.trim();
                if !piece.is_empty() {
                    chunks.push(piece.to_string());
                }
                break;
            }
        };

        let cut = remaining[..limit]
            .rfind(|c: char| c == '\n' || c == ' ')
            .filter(|&pos| pos > 0)
            .unwrap_or(limit);
        let piece = remaining[..cut].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        remaining = remaining[cut..].trim_start();
    }
}
