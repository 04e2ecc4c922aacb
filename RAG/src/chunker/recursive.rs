//! Recursive separator-priority chunking (spec.md §4.3): tries to break
//! at a paragraph boundary first, then a line, then a word, only
//! hard-cutting when none exists within the configured window. Chunks
//! self-report `chunk_type: CharacterWise` per spec.md §9's
//! compatibility note — only two chunk-type values are ever recorded.

use super::page_for_offset;
use crate::config::RecursiveConfig;
use crate::models::{ChunkMetadata, ChunkType, DocumentChunk};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

pub fn chunk_recursive(
    page_texts: &[String],
    full_text: &str,
    config: &RecursiveConfig,
) -> Vec<DocumentChunk> {
    let chars: Vec<char> = full_text.chars().collect();
    let len = chars.len();
    if len == 0 {
        return Vec::new();
    }

    let chunk_size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(chunk_size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let hard_end = (start + chunk_size).min(len);
        let break_at = if hard_end < len {
            find_separator_break(&chars, start, hard_end).unwrap_or(hard_end)
        } else {
            hard_end
        };

        let slice: String = chars[start..break_at].iter().collect();
        let trimmed = slice.trim();

        if !trimmed.is_empty() {
            let page = page_for_offset(page_texts, start);
            let starts_on_boundary = start == 0 || preceding_is_paragraph_break(&chars, start);
            let ends_on_boundary = break_at >= len || following_is_paragraph_break(&chars, break_at);
            let looks_complete = looks_like_complete_sentence(trimmed);

            let metadata = ChunkMetadata {
                chunk_type: Some(ChunkType::CharacterWise),
                start_index: Some(start),
                end_index: Some(break_at),
                character_count: Some(trimmed.chars().count()),
                looks_like_complete_sentence: Some(looks_complete),
                starts_on_paragraph_boundary: Some(starts_on_boundary),
                ends_on_paragraph_boundary: Some(ends_on_boundary),
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

fn find_separator_break(chars: &[char], start: usize, hard_end: usize) -> Option<usize> {
    for separator in SEPARATORS.iter().filter(|s| !s.is_empty()) {
        let sep_chars: Vec<char> = separator.chars().collect();
        if let Some(pos) = find_last_occurrence(chars, start, hard_end, &sep_chars) {
            return Some(pos + sep_chars.len());
        }
    }
    None
}

fn find_last_occurrence(chars: &[char], start: usize, end: usize, needle: &[char]) -> Option<usize> {
    if needle.is_empty() || end < start + needle.len() {
        return None;
    }
    for i in (start..=end - needle.len()).rev() {
        if chars[i..i + needle.len()] == *needle {
            return Some(i);
        }
    }
    None
}

fn preceding_is_paragraph_break(chars: &[char], pos: usize) -> bool {
    pos >= 2 && chars[pos - 2] == '\n' && chars[pos - 1] == '\n'
}

fn following_is_paragraph_break(chars: &[char], pos: usize) -> bool {
    pos + 1 < chars.len() && chars[pos] == '\n' && chars[pos + 1] == '\n'
}

fn looks_like_complete_sentence(text: &str) -> bool {
    let ends_right = text
        .chars()
        .last()
        .map(|c| matches!(c, '.' | '!' | '?' | ';' | ':'))
        .unwrap_or(false);
    let starts_right = text
        .chars()
        .next()
        .map(|c| c.is_uppercase() || c.is_numeric() || c == '-' || c == '*')
        .unwrap_or(false);
    ends_right && starts_right
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(chunk_size: usize, overlap: usize) -> RecursiveConfig {
        RecursiveConfig {
            enabled: true,
            chunk_size,
            chunk_overlap: overlap,
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_recursive(&[], "", &cfg(100, 10)).is_empty());
    }

    #[test]
    fn prefers_paragraph_break_over_hard_cut() {
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let pages = vec![text.clone()];
        let chunks = chunk_recursive(&pages, &text, &cfg(45, 5));
        assert!(chunks[0].content.chars().all(|c| c == 'a'));
    }

    #[test]
    fn all_chunks_are_trimmed_and_non_empty() {
        let text = "Sentence one. Sentence two. Sentence three. ".repeat(30);
        let pages = vec![text.clone()];
        let chunks = chunk_recursive(&pages, &text, &cfg(80, 10));
        for c in &chunks {
            assert!(!c.content.is_empty());
            assert_eq!(c.content, c.content.trim());
        }
    }

    #[test]
    fn complete_sentence_flag_detects_proper_boundaries() {
        assert!(looks_like_complete_sentence("Hello there."));
        assert!(!looks_like_complete_sentence("ello there"));
    }
}
