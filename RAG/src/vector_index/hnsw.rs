//! HNSW-backed approximate nearest-neighbour index, used when
//! `vectorSearch.useHNSW=true` and the corpus exceeds the configured
//! minimum size (spec.md §4.5). Built on the `hnsw_rs` crate rather than
//! the `usearch` git dependency seen in the reference RLM crate, to
//! avoid a non-registry dependency (see DESIGN.md).

use hnsw_rs::prelude::*;

use super::cosine_similarity;
use crate::models::{DocumentChunk, ScoredChunk};

const MAX_NB_CONNECTION: usize = 16;
const EF_CONSTRUCTION: usize = 200;
const EF_SEARCH: usize = 64;
const MAX_LAYER: usize = 16;

pub struct HnswIndex {
    entries: Vec<(DocumentChunk, Vec<f32>)>,
    graph: Hnsw<'static, f32, DistCosine>,
}

impl HnswIndex {
    pub fn build(entries: Vec<(DocumentChunk, Vec<f32>)>) -> Self {
        let graph: Hnsw<f32, DistCosine> = Hnsw::new(
            MAX_NB_CONNECTION,
            entries.len().max(1),
            MAX_LAYER,
            EF_CONSTRUCTION,
            DistCosine {},
        );

        for (id, (_, vector)) in entries.iter().enumerate() {
            graph.insert((vector.as_slice(), id));
        }

        Self { entries, graph }
    }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        if k == 0 {
            return Vec::new();
        }
        let neighbours = self.graph.search(query, k, EF_SEARCH);

        let mut results: Vec<ScoredChunk> = neighbours
            .into_iter()
            .map(|n| {
                let (chunk, vector) = &self.entries[n.d_id];
                ScoredChunk {
                    chunk: chunk.clone(),
                    score: cosine_similarity(query, vector),
                }
            })
            .collect();

        // hnsw_rs returns results sorted by ascending distance; re-sort by
        // descending cosine score for the same contract `ExactIndex` uses.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results
    }
}
