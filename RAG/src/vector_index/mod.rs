//! Per-request in-memory vector index (spec.md §4.5, C5). Exact cosine
//! scan by default; builds an HNSW graph instead when `useHNSW=true` and
//! the corpus exceeds `hnswMinSize`, with the same top-k contract either
//! way.

mod exact;
mod hnsw;

use crate::config::VectorSearchConfig;
use crate::models::{DocumentChunk, IndexMemoryReport, ScoredChunk};

enum Backend {
    Exact(exact::ExactIndex),
    Hnsw(hnsw::HnswIndex),
}

/// Owns embedded chunks for exactly one request; built once after
/// embedding, queried once per question, dropped with the request
/// (spec.md §3, "Vector index" lifecycle).
pub struct VectorIndex {
    backend: Backend,
    chunk_count: usize,
    content_bytes: usize,
    dimension: usize,
}

impl VectorIndex {
    /// Builds the index from `(chunk, vector)` pairs in insertion order,
    /// choosing the exact or HNSW backend per `config`.
    pub fn build(entries: Vec<(DocumentChunk, Vec<f32>)>, config: &VectorSearchConfig) -> Self {
        let chunk_count = entries.len();
        let content_bytes: usize = entries.iter().map(|(c, _)| c.content.len()).sum();
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(0);

        let backend = if config.use_hnsw && chunk_count > config.hnsw_min_size {
            Backend::Hnsw(hnsw::HnswIndex::build(entries))
        } else {
            Backend::Exact(exact::ExactIndex::build(entries))
        };

        Self {
            backend,
            chunk_count,
            content_bytes,
            dimension,
        }
    }

    /// Top-k by cosine similarity, ties broken by insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let k = k.min(self.chunk_count);
        match &self.backend {
            Backend::Exact(index) => index.search(query, k),
            Backend::Hnsw(index) => index.search(query, k),
        }
    }

    pub fn len(&self) -> usize {
        self.chunk_count
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }

    /// `(chunkCount*d*4 + Σ|content|) / 1e6` (spec.md §4.5).
    pub fn memory_report(&self) -> IndexMemoryReport {
        let vector_bytes = self.chunk_count * self.dimension * 4;
        let estimated_mb = (vector_bytes + self.content_bytes) as f64 / 1_000_000.0;
        IndexMemoryReport {
            chunk_count: self.chunk_count,
            estimated_memory_mb: estimated_mb,
        }
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let dot: f32 = a[..len].iter().zip(&b[..len]).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a[..len].iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b[..len].iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Selects `chunksToLLM` for a document, reduced for "large" documents
/// (spec.md §4.5).
pub fn chunks_to_llm(total_pages: usize, dynamic: &crate::config::DynamicChunkingConfig) -> usize {
    if total_pages >= dynamic.page_threshold {
        dynamic.large_document_chunks_to_llm
    } else {
        dynamic.default_chunks_to_llm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn chunk(page: usize, content: &str) -> DocumentChunk {
        DocumentChunk::new(page, content.to_string(), ChunkMetadata::default())
    }

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn chunks_to_llm_switches_at_page_threshold() {
        let dynamic = crate::config::DynamicChunkingConfig {
            page_threshold: 50,
            default_chunks_to_llm: 8,
            large_document_chunks_to_llm: 4,
        };
        assert_eq!(chunks_to_llm(10, &dynamic), 8);
        assert_eq!(chunks_to_llm(50, &dynamic), 4);
    }

    #[test]
    fn exact_search_returns_k_results_sorted_descending() {
        let entries = vec![
            (chunk(1, "a"), vec![1.0, 0.0]),
            (chunk(2, "b"), vec![0.0, 1.0]),
            (chunk(3, "c"), vec![0.7, 0.7]),
        ];
        let config = VectorSearchConfig {
            use_hnsw: false,
            hnsw_min_size: 500,
        };
        let index = VectorIndex::build(entries, &config);
        let results = index.search(&[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        assert_eq!(results[0].chunk.page_number, 1);
    }

    #[test]
    fn memory_report_accounts_for_vectors_and_content() {
        let entries = vec![(chunk(1, "hello"), vec![0.0; 4])];
        let config = VectorSearchConfig {
            use_hnsw: false,
            hnsw_min_size: 500,
        };
        let index = VectorIndex::build(entries, &config);
        let report = index.memory_report();
        assert_eq!(report.chunk_count, 1);
        assert!(report.estimated_memory_mb > 0.0);
    }
}
