//! `cl100k_base` BPE tokenizer.
//!
//! Used for token-window chunking and for measuring context budgets in
//! tokens. The encoding tables are compiled into `tiktoken-rs`, so no
//! download is needed.

use anyhow::{anyhow, Result};
use tiktoken_rs::CoreBPE;

use spec_rag_core::chunk::Tokenizer;

pub struct TiktokenTokenizer {
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    pub fn cl100k() -> Result<Self> {
        let bpe =
            tiktoken_rs::cl100k_base().map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|t| t as u32)
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.bpe
            .decode(tokens.iter().map(|&t| t as _).collect())
            .map_err(|e| anyhow!("Failed to decode tokens: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spec_rag_core::chunk::chunk_by_tokens;

    #[test]
    fn test_roundtrip_text() {
        let tok = TiktokenTokenizer::cl100k().unwrap();
        let text = "Token windows overlap by a fixed number of tokens.";
        let tokens = tok.encode(text);
        assert!(!tokens.is_empty());
        assert_eq!(tok.decode(&tokens).unwrap(), text);
        assert_eq!(tok.count(text), tokens.len());
    }

    #[test]
    fn test_windows_over_multibyte_text_decode() {
        let tok = TiktokenTokenizer::cl100k().unwrap();
        let text = "日本語のテキストと絵文字 🎉🎉 を含む仕様書。".repeat(5);
        let chunks = chunk_by_tokens(&tok, &text, 7, 3);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(text.contains(chunk.as_str()));
        }
    }

    #[test]
    fn test_zero_overlap_windows_cover_multibyte_text() {
        let tok = TiktokenTokenizer::cl100k().unwrap();
        let text = "仕様🎉書🎉の🎉テ🎉キ🎉ス🎉ト ".repeat(40);
        for size in [2, 16, 50, 100] {
            let chunks = chunk_by_tokens(&tok, &text, size, 0);
            assert_eq!(chunks.concat(), text, "size {}", size);
        }
    }

    #[test]
    fn test_overlapping_windows_keep_every_emoji() {
        let tok = TiktokenTokenizer::cl100k().unwrap();
        let text = "仕様🎉書🎉の🎉テ🎉キ🎉ス🎉ト ".repeat(40);
        let chunks = chunk_by_tokens(&tok, &text, 100, 1);
        assert!(text.starts_with(chunks[0].as_str()));
        assert!(text.ends_with(chunks.last().unwrap().as_str()));
        let emojis: usize = chunks.iter().map(|c| c.matches('🎉').count()).sum();
        assert!(emojis >= 240, "only {} emojis survived", emojis);
    }
}
