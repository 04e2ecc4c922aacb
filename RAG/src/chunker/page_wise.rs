//! Page-wise chunking (spec.md §4.3): merges consecutive `pageTexts` so
//! each chunk spans `pagesPerChunk` pages.

use crate::config::PageWiseConfig;
use crate::models::{ChunkMetadata, ChunkType, DocumentChunk};

pub fn chunk_page_wise(page_texts: &[String], config: &PageWiseConfig) -> Vec<DocumentChunk> {
    let pages_per_chunk = config.pages_per_chunk.max(1);
    let mut chunks = Vec::new();

    let mut start = 0usize;
    while start < page_texts.len() {
        let end = (start + pages_per_chunk).min(page_texts.len());
        let group = &page_texts[start..end];
        let content = group.join("\n---\n");
        let trimmed = content.trim();

        if !trimmed.is_empty() {
            let actual_page = start + 1;
            let end_page = end;
            let metadata = ChunkMetadata {
                chunk_type: Some(ChunkType::PageWise),
                pages_in_chunk: Some(end_page - actual_page + 1),
                actual_page_number: Some(actual_page),
                end_page_number: Some(end_page),
                character_count: Some(trimmed.chars().count()),
                ..Default::default()
            };
            chunks.push(DocumentChunk::new(actual_page, trimmed.to_string(), metadata));
        }

        start = end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_page_per_chunk_yields_one_chunk_per_page() {
        let pages = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let chunks = chunk_page_wise(&pages, &PageWiseConfig { pages_per_chunk: 1 });
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[0].metadata.pages_in_chunk, Some(1));
        assert_eq!(chunks[2].metadata.actual_page_number, Some(3));
        assert_eq!(chunks[2].metadata.end_page_number, Some(3));
    }

    #[test]
    fn two_pages_per_chunk_groups_pages() {
        let pages = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let chunks = chunk_page_wise(&pages, &PageWiseConfig { pages_per_chunk: 2 });
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.pages_in_chunk, Some(2));
        assert_eq!(chunks[1].metadata.pages_in_chunk, Some(1));
    }

    #[test]
    fn blank_pages_are_skipped() {
        let pages = vec!["".to_string(), "content".to_string()];
        let chunks = chunk_page_wise(&pages, &PageWiseConfig { pages_per_chunk: 1 });
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_number, 2);
    }
}
