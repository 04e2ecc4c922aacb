//! Exact cosine-similarity scan — the default backend (spec.md §4.5).

use super::cosine_similarity;
use crate::models::{DocumentChunk, ScoredChunk};

pub struct ExactIndex {
    entries: Vec<(DocumentChunk, Vec<f32>)>,
}

impl ExactIndex {
    pub fn build(entries: Vec<(DocumentChunk, Vec<f32>)>) -> Self {
        Self { entries }
    }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (_, vector))| (i, cosine_similarity(query, vector)))
            .collect();

        // Stable sort by descending score keeps ties in insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].0.clone(),
                score,
            })
            .collect()
    }
}
