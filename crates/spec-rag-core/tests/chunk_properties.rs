use anyhow::Result;
use proptest::prelude::*;

use spec_rag_core::chunk::{chunk_by_paragraphs, chunk_by_tokens, token_windows, Tokenizer};

struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().map(|c| c as u32).collect()
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        tokens
            .iter()
            .map(|&t| char::from_u32(t).ok_or_else(|| anyhow::anyhow!("bad token {}", t)))
            .collect()
    }
}

/// One token per UTF-8 byte, so windows routinely split characters.
struct ByteTokenizer;

impl Tokenizer for ByteTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        text.bytes().map(u32::from).collect()
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        let bytes: Vec<u8> = tokens.iter().map(|&t| t as u8).collect();
        Ok(String::from_utf8(bytes)?)
    }
}

fn size_and_overlap() -> impl Strategy<Value = (usize, usize)> {
    (1usize..64).prop_flat_map(|size| (Just(size), 0..size))
}

proptest! {
    #[test]
    fn windows_cover_sequence_without_gaps(total in 0usize..500, (size, overlap) in size_and_overlap()) {
        let windows = token_windows(total, size, overlap);
        if total == 0 {
            prop_assert!(windows.is_empty());
            return Ok(());
        }

        prop_assert_eq!(windows[0].start, 0);
        prop_assert_eq!(windows.last().unwrap().end, total);
        for w in &windows {
            prop_assert!(w.end - w.start <= size);
        }
        for pair in windows.windows(2) {
            prop_assert_eq!(pair[1].start, pair[0].end - overlap);
        }
        if total <= size {
            prop_assert_eq!(windows.len(), 1);
        }
    }

    #[test]
    fn token_chunks_reconstruct_text(text in "[a-z ]{1,300}", (size, overlap) in size_and_overlap()) {
        prop_assume!(!text.trim().is_empty());
        let chunks = chunk_by_tokens(&CharTokenizer, &text, size, overlap);

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            let skip = chunk.chars().count().min(overlap);
            rebuilt.extend(chunk.chars().skip(skip));
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn byte_windows_concatenate_to_text(text in "\\PC{1,200}", size in 1usize..40) {
        prop_assume!(!text.trim().is_empty());
        let chunks = chunk_by_tokens(&ByteTokenizer, &text, size, 0);
        prop_assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn byte_windows_overlap_without_gaps(text in "\\PC{1,120}", (size, overlap) in size_and_overlap()) {
        prop_assume!(!text.trim().is_empty());
        let chunks = chunk_by_tokens(&ByteTokenizer, &text, size, overlap);

        prop_assert!(text.starts_with(chunks[0].as_str()));
        prop_assert!(text.ends_with(chunks.last().unwrap().as_str()));
        // Each chunk must begin at or before the end of what is covered so far.
        let mut covered = 0;
        for chunk in &chunks {
            let at = (0..=covered)
                .rev()
                .filter(|&i| text.is_char_boundary(i))
                .find(|&i| text[i..].starts_with(chunk.as_str()));
            prop_assert!(at.is_some(), "gap before {:?}", chunk);
            covered = covered.max(at.unwrap() + chunk.len());
        }
        prop_assert_eq!(covered, text.len());
    }

    #[test]
    fn paragraph_chunks_stay_within_limit(
        paras in prop::collection::vec("[a-zé ]{0,80}", 0..20),
        max_chars in 1usize..120,
    ) {
        let text = paras.join("\n\n");
        for chunk in chunk_by_paragraphs(&text, max_chars) {
            prop_assert!(chunk.chars().count() <= max_chars);
            prop_assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn paragraph_chunks_keep_every_word(
        paras in prop::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,10}", 1..10),
        max_chars in 10usize..120,
    ) {
        let text = paras.join("\n\n");
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let chunked: Vec<String> = chunk_by_paragraphs(&text, max_chars)
            .iter()
            .flat_map(|c| c.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .collect();
        prop_assert_eq!(chunked, words);
    }
}
