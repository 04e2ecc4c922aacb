//! Character-wise chunking (spec.md §4.3): sliding window over the
//! flattened text, breaking preferentially at a sentence/line/word
//! boundary rather than mid-word.

use super::page_for_offset;
use crate::config::CharacterWiseConfig;
use crate::models::{ChunkMetadata, ChunkType, DocumentChunk};

pub fn chunk_character_wise(
    page_texts: &[String],
    full_text: &str,
    config: &CharacterWiseConfig,
) -> Vec<DocumentChunk> {
    let chars: Vec<char> = full_text.chars().collect();
    let len = chars.len();
    if len == 0 {
        return Vec::new();
    }

    let chunk_size = config.chunk_size.max(1);
    let overlap = config.overlap.min(chunk_size.saturating_sub(1));
    let min_break_pos = (chunk_size as f64 * config.min_chunk_size_ratio) as usize;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let hard_end = (start + chunk_size).min(len);
        let break_at = if hard_end < len {
            find_break_point(&chars, start, hard_end, min_break_pos).unwrap_or(hard_end)
        } else {
            hard_end
        };

        let slice: String = chars[start..break_at].iter().collect();
        let trimmed = slice.trim();

        if !trimmed.is_empty() {
            let page = page_for_offset(page_texts, start);
            let metadata = ChunkMetadata {
                chunk_type: Some(ChunkType::CharacterWise),
                start_index: Some(start),
                end_index: Some(break_at),
                character_count: Some(trimmed.chars().count()),
                ..Default::default()
            };
            chunks.push(DocumentChunk::new(page, trimmed.to_string(), metadata));
        }

        if break_at >= len {
            break;
        }
        start = break_at.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Looks for the last `.`, `\n`, or space in `[min_break_pos, hard_end)`
/// relative to `start`, so a chunk never ends mid-word when a natural
/// boundary exists past the configured minimum fill ratio.
fn find_break_point(chars: &[char], start: usize, hard_end: usize, min_break_pos: usize) -> Option<usize> {
    let floor = start + min_break_pos;
    if floor >= hard_end {
        return None;
    }
    for i in (floor..hard_end).rev() {
        match chars[i] {
            '.' | '\n' | ' ' => return Some(i + 1),
            _ => continue,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(chunk_size: usize, overlap: usize) -> CharacterWiseConfig {
        CharacterWiseConfig {
            enabled: true,
            chunk_size,
            overlap,
            min_chunk_size_ratio: 0.5,
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_character_wise(&[], "", &cfg(100, 10)).is_empty());
    }

    #[test]
    fn chunks_are_non_empty_and_trimmed() {
        let text = "word ".repeat(200);
        let pages = vec![text.clone()];
        let chunks = chunk_character_wise(&pages, &text, &cfg(100, 20));
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(!c.content.is_empty());
            assert_eq!(c.content, c.content.trim());
        }
    }

    #[test]
    fn successive_chunks_progress_forward() {
        let text = "abcdefghij".repeat(50);
        let pages = vec![text.clone()];
        let chunks = chunk_character_wise(&pages, &text, &cfg(50, 10));
        assert!(chunks.len() > 1);
        let mut last_start = 0;
        for c in &chunks {
            let start = c.metadata.start_index.unwrap();
            assert!(start >= last_start);
            last_start = start;
        }
    }
}
