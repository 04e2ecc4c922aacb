//! Chunking strategies (spec.md §4.3, C3).
//!
//! `chunk()` selects a strategy by configuration precedence
//! `recursive > character-wise > page-wise (default)` and returns
//! `DocumentChunk[]` satisfying the shared invariants: every chunk's
//! content is non-empty and trimmed, coverage of the source text is
//! near-total, and overlap between successive chunks never exceeds the
//! configured chunk size.

mod character_wise;
mod page_wise;
mod recursive;

use crate::config::ChunkingConfig;
use crate::models::DocumentChunk;

pub use character_wise::chunk_character_wise;
pub use page_wise::chunk_page_wise;
pub use recursive::chunk_recursive;

/// Maps a char offset in `full_text` (built as `pageTexts.join("\n---\n")`)
/// back to a 1-based page number, for strategies that operate on the
/// flattened text rather than per-page.
pub(crate) fn page_for_offset(page_texts: &[String], offset: usize) -> usize {
    const SEPARATOR_LEN: usize = 5; // "\n---\n"
    let mut cursor = 0usize;
    for (idx, page) in page_texts.iter().enumerate() {
        let page_len = page.chars().count();
        let page_end = cursor + page_len;
        if offset <= page_end {
            return idx + 1;
        }
        cursor = page_end + SEPARATOR_LEN;
    }
    page_texts.len().max(1)
}

/// Chooses a strategy by config precedence and runs it.
pub fn chunk(page_texts: &[String], full_text: &str, config: &ChunkingConfig) -> Vec<DocumentChunk> {
    if config.recursive.enabled {
        return chunk_recursive(page_texts, full_text, &config.recursive);
    }
    if config.character_wise.enabled {
        return chunk_character_wise(page_texts, full_text, &config.character_wise);
    }
    chunk_page_wise(page_texts, &config.page_wise)
}
