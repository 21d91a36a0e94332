//! Markdown title and section extraction.
//!
//! A line-oriented scanner that recognises ATX (`## Title`, `##Title`) and
//! setext (`Title` over `===`/`---`) headings, skips fenced code blocks, and
//! reduces heading text to plain text. A setext underline only promotes the
//! first line of a block; under a later paragraph line it stays text. It never fails: input without
//! headings yields zero sections and the [`UNTITLED`] placeholder.
//!
//! # Example
//!
//! ```rust
//! use spec_rag_core::markdown::parse_markdown;
//!
//! let parsed = parse_markdown("# Hello World\n\nbody");
//! assert_eq!(parsed.title, "Hello World");
//! assert_eq!(parsed.sections.len(), 1);
//! ```

use crate::models::Section;

/// Title used when a document has no level-1 heading.
pub const UNTITLED: &str = "Untitled";

/// Result of [`parse_markdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMarkdown {
    pub title: String,
    pub sections: Vec<Section>,
}

struct Heading {
    /// First line of the heading (the text line for setext headings).
    line: usize,
    /// First line after the heading markup.
    body_start: usize,
    level: u8,
    title: String,
}

/// Extract the title and heading outline of a markdown document.
///
/// The title is the first non-empty level-1 heading. Each heading opens a
/// section whose body runs until the next heading of equal or lesser level.
pub fn parse_markdown(text: &str) -> ParsedMarkdown {
    let lines: Vec<&str> = text.lines().collect();
    let headings = scan_headings(&lines);

    let sections = headings
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            let end = headings[idx + 1..]
                .iter()
                .find(|next| next.level <= h.level)
                .map_or(lines.len(), |next| next.line);
            let content = if h.body_start < end {
                lines[h.body_start..end].join("\n").trim().to_string()
            } else {
                String::new()
            };
            Section {
                level: h.level,
                title: h.title.clone(),
                content,
            }
        })
        .collect();

    let title = headings
        .iter()
        .find(|h| h.level == 1 && !h.title.is_empty())
        .map(|h| h.title.clone())
        .unwrap_or_else(|| UNTITLED.to_string());

    ParsedMarkdown { title, sections }
}

fn scan_headings(lines: &[&str]) -> Vec<Heading> {
    let mut headings: Vec<Heading> = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some((ch, len, has_info)) = fence_marker(line) {
            match fence {
                None => fence = Some((ch, len)),
                Some((open_ch, open_len)) if ch == open_ch && len >= open_len && !has_info => {
                    fence = None
                }
                _ => {}
            }
            i += 1;
            continue;
        }
        if fence.is_some() {
            i += 1;
            continue;
        }

        if let Some((level, title)) = atx_heading(line) {
            headings.push(Heading {
                line: i,
                body_start: i + 1,
                level,
                title,
            });
            i += 1;
            continue;
        }

        let starts_block = i == 0
            || lines[i - 1].trim().is_empty()
            || headings.last().is_some_and(|h| h.body_start == i);
        if starts_block && is_plain_text_line(line) && i + 1 < lines.len() {
            if let Some(level) = setext_underline(lines[i + 1]) {
                headings.push(Heading {
                    line: i,
                    body_start: i + 2,
                    level,
                    title: plain_text(line.trim()),
                });
                i += 2;
                continue;
            }
        }

        i += 1;
    }

    headings
}

/// Leading indentation in spaces, or `None` beyond the 3 markdown allows.
fn strip_indent(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        None
    } else {
        Some(trimmed)
    }
}

/// Returns `(fence char, run length, has info string)` for a fence line.
fn fence_marker(line: &str) -> Option<(char, usize, bool)> {
    let trimmed = strip_indent(line)?;
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&c| c == ch).count();
    if run < 3 {
        return None;
    }
    let info = trimmed[run..].trim();
    Some((ch, run, !info.is_empty()))
}

/// `#` to `######` at the start of the line, with or without a following
/// space. Extra hashes beyond six belong to the title; a trailing run of
/// hashes is dropped.
fn atx_heading(line: &str) -> Option<(u8, String)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count().min(6);
    if hashes == 0 {
        return None;
    }
    let title = line[hashes..].trim_end_matches('#').trim();
    Some((hashes as u8, plain_text(title)))
}

fn setext_underline(line: &str) -> Option<u8> {
    let trimmed = strip_indent(line)?.trim_end();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c == '=') {
        Some(1)
    } else if trimmed.len() >= 2 && trimmed.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

/// Whether a line can be the text of a setext heading.
fn is_plain_text_line(line: &str) -> bool {
    let Some(trimmed) = strip_indent(line) else {
        return false;
    };
    if trimmed.trim().is_empty() || setext_underline(trimmed).is_some() {
        return false;
    }
    let is_list_item = trimmed.starts_with("- ")
        || trimmed.starts_with("* ")
        || trimmed.starts_with("+ ")
        || trimmed
            .split_once(". ")
            .is_some_and(|(n, _)| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    !(is_list_item || trimmed.starts_with('>') || trimmed.starts_with('|'))
}

/// Reduce inline markdown to its visible text.
///
/// Drops code ticks and `*` emphasis, turns `[text](url)` and
/// `![alt](src)` into their text, and collapses whitespace.
fn plain_text(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '`' | '*' => i += 1,
            '!' if chars.get(i + 1) == Some(&'[') => i += 1,
            '[' => match link_end(&chars, i) {
                Some((close, end)) => {
                    let label: String = chars[i + 1..close].iter().collect();
                    out.push_str(&plain_text(&label));
                    i = end + 1;
                }
                None => {
                    out.push('[');
                    i += 1;
                }
            },
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// For a `[` at `open`, the positions of the matching `]` and of the `)`
/// closing an immediately following `(url)`.
fn link_end(chars: &[char], open: usize) -> Option<(usize, usize)> {
    let close = open + 1 + chars[open + 1..].iter().position(|&c| c == ']')?;
    if chars.get(close + 1) != Some(&'(') {
        return None;
    }
    let paren = close + 2 + chars[close + 2..].iter().position(|&c| c == ')')?;
    Some((close, paren))
}
