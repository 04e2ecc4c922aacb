//! Batched embedding client (spec.md §4.4): splits input into groups of
//! `embeddingBatch.batchSize`, issues them concurrently via
//! `futures::future::join_all` (grounded in
//! `examples/other_examples/38d256a0_foofork-riptidecrawler__.../pipeline.rs`'s
//! spawn+join_all fan-out), fails a batch over to the secondary provider
//! once, and preserves input order even when the deadline cuts work
//! short.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::provider::{EmbeddingKind, EmbeddingProvider};
use crate::deadline::Deadline;

pub struct EmbeddingClient {
    primary: Arc<dyn EmbeddingProvider>,
    secondary: Option<Arc<dyn EmbeddingProvider>>,
    batch_size: usize,
    batching_enabled: bool,
    chunk_timeout_ms: u64,
    question_timeout_ms: u64,
}

impl EmbeddingClient {
    pub fn new(
        primary: Arc<dyn EmbeddingProvider>,
        secondary: Option<Arc<dyn EmbeddingProvider>>,
        batch_size: usize,
    ) -> Self {
        Self::with_config(primary, secondary, batch_size, true, 15_000, 8_000)
    }

    /// `batching_enabled` false sends every call as a single batch
    /// (`embeddingBatch.enabled`); `chunk_timeout_ms`/`question_timeout_ms`
    /// clamp each batch's sub-timeout against the request deadline
    /// (spec.md §5, `embeddingTimeoutMs`/`questionEmbeddingTimeoutMs`).
    pub fn with_config(
        primary: Arc<dyn EmbeddingProvider>,
        secondary: Option<Arc<dyn EmbeddingProvider>>,
        batch_size: usize,
        batching_enabled: bool,
        chunk_timeout_ms: u64,
        question_timeout_ms: u64,
    ) -> Self {
        Self {
            primary,
            secondary,
            batch_size: batch_size.max(1),
            batching_enabled,
            chunk_timeout_ms,
            question_timeout_ms,
        }
    }

    /// Embeds every text in `texts`, preserving order. Entries whose
    /// batch could not complete before the deadline fired, or whose
    /// batch failed on both providers, come back as `None` (spec.md
    /// §4.4 invariant: "padded with nil for missing").
    pub async fn embed(
        &self,
        texts: &[String],
        kind: EmbeddingKind,
        deadline: &Deadline,
    ) -> Vec<Option<Vec<f32>>> {
        if texts.is_empty() {
            return Vec::new();
        }

        let timeout_ms = match kind {
            EmbeddingKind::Chunk => self.chunk_timeout_ms,
            EmbeddingKind::Question => self.question_timeout_ms,
        };
        let sub_timeout = deadline.clamp(Duration::from_millis(timeout_ms));

        let effective_batch_size = if self.batching_enabled {
            self.batch_size
        } else {
            texts.len()
        };

        let batches: Vec<(usize, Vec<String>)> = texts
            .chunks(effective_batch_size)
            .enumerate()
            .map(|(i, chunk)| (i * effective_batch_size, chunk.to_vec()))
            .collect();

        let futures = batches.into_iter().map(|(offset, batch)| {
            let primary = self.primary.clone();
            let secondary = self.secondary.clone();
            let kind = kind.clone();
            async move {
                let timed = tokio::time::timeout(
                    sub_timeout,
                    Self::embed_with_failover(primary, secondary, batch.clone(), kind),
                );
                let result = match deadline.race(timed).await {
                    Some(Ok(inner)) => Some(inner),
                    _ => None,
                };
                (offset, batch.len(), result)
            }
        });

        let batch_results = join_all(futures).await;

        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for (offset, batch_len, result) in batch_results {
            if let Some(Ok(vectors)) = result {
                for (i, vector) in vectors.into_iter().enumerate() {
                    if offset + i < out.len() {
                        out[offset + i] = Some(vector);
                    }
                }
            } else {
                let _ = batch_len; // batch failed or deadline fired; leave as None
            }
        }
        out
    }

    async fn embed_with_failover(
        primary: Arc<dyn EmbeddingProvider>,
        secondary: Option<Arc<dyn EmbeddingProvider>>,
        batch: Vec<String>,
        kind: EmbeddingKind,
    ) -> Result<Vec<Vec<f32>>, String> {
        match primary.embed(&batch, kind.clone()).await {
            Ok(vectors) => Ok(vectors),
            Err(primary_err) => match secondary {
                Some(fallback) => fallback
                    .embed(&batch, kind)
                    .await
                    .map_err(|secondary_err| format!("{primary_err}; fallback also failed: {secondary_err}")),
                None => Err(primary_err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::DeadlineRegistry;
    use crate::embedding::provider::test_support::{DeterministicProvider, FailingProvider};
    use uuid::Uuid;

    #[tokio::test]
    async fn preserves_order_across_batches() {
        let provider = Arc::new(DeterministicProvider { dimension: 4 });
        let client = EmbeddingClient::new(provider, None, 2);
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), Some(5.0));

        let texts: Vec<String> = (0..7).map(|i| format!("text-{i}")).collect();
        let results = client.embed(&texts, EmbeddingKind::Chunk, &deadline).await;

        assert_eq!(results.len(), 7);
        assert!(results.iter().all(|r| r.is_some()));
    }

    #[tokio::test]
    async fn falls_over_to_secondary_on_primary_failure() {
        let primary = Arc::new(FailingProvider);
        let secondary = Arc::new(DeterministicProvider { dimension: 4 });
        let client = EmbeddingClient::new(primary, Some(secondary), 10);
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), Some(5.0));

        let texts = vec!["hello".to_string(), "world".to_string()];
        let results = client.embed(&texts, EmbeddingKind::Chunk, &deadline).await;

        assert!(results.iter().all(|r| r.is_some()));
    }

    #[tokio::test]
    async fn both_providers_failing_yields_none_entries() {
        let primary = Arc::new(FailingProvider);
        let client = EmbeddingClient::new(primary, None, 10);
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), Some(5.0));

        let texts = vec!["hello".to_string()];
        let results = client.embed(&texts, EmbeddingKind::Chunk, &deadline).await;

        assert_eq!(results, vec![None]);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let provider = Arc::new(DeterministicProvider { dimension: 4 });
        let client = EmbeddingClient::new(provider, None, 10);
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), Some(5.0));

        let results = client.embed(&[], EmbeddingKind::Question, &deadline).await;
        assert!(results.is_empty());
    }

    struct CountingProvider {
        dimension: usize,
        batch_sizes: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, texts: &[String], _kind: EmbeddingKind) -> Result<Vec<Vec<f32>>, String> {
            self.batch_sizes.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|_| vec![0.0; self.dimension]).collect())
        }

        fn name(&self) -> &'static str {
            "counting"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    #[tokio::test]
    async fn disabled_batching_sends_everything_as_one_batch() {
        let provider = Arc::new(CountingProvider {
            dimension: 4,
            batch_sizes: std::sync::Mutex::new(Vec::new()),
        });
        let client = EmbeddingClient::with_config(provider.clone(), None, 2, false, 15_000, 8_000);
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), Some(5.0));

        let texts: Vec<String> = (0..7).map(|i| format!("text-{i}")).collect();
        let results = client.embed(&texts, EmbeddingKind::Chunk, &deadline).await;

        assert_eq!(results.len(), 7);
        assert_eq!(provider.batch_sizes.lock().unwrap().as_slice(), &[7]);
    }
}
