//! `EmbeddingProvider`: the `embed(texts, model) -> float[][]` capability
//! boundary (spec.md §6). Grounded in the same `async_trait` + thiserror
//! shape as `examples/other_examples/b5ba6446_scottidler-loopr__src-llm-client.rs.rs`'s
//! `LlmClient` trait, adapted from chat completion to embedding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub enum EmbeddingKind {
    Chunk,
    Question,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String], kind: EmbeddingKind) -> Result<Vec<Vec<f32>>, String>;

    fn name(&self) -> &'static str;

    /// Vector dimension this provider produces; used to validate the
    /// `DimensionMismatch` invariant (spec.md §3).
    fn dimension(&self) -> usize;
}

/// Generic HTTP embeddings backend. Matches the narrow external contract
/// `Embeddings.embed(texts[], model) -> float[][]` (spec.md §6).
pub struct HttpEmbeddingProvider {
    pub endpoint: String,
    pub model: String,
    pub dimension: usize,
    pub api_key: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    vectors: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, texts: &[String], _kind: EmbeddingKind) -> Result<Vec<Vec<f32>>, String> {
        let client = reqwest::Client::new();
        let mut request = client.post(&self.endpoint).json(&EmbedRequest {
            texts,
            model: &self.model,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("embedding provider returned status {}", resp.status()));
        }

        let body: EmbedResponse = resp.json().await.map_err(|e| e.to_string())?;
        if body.vectors.len() != texts.len() {
            return Err(format!(
                "provider returned {} vectors for {} inputs",
                body.vectors.len(),
                texts.len()
            ));
        }
        Ok(body.vectors)
    }

    fn name(&self) -> &'static str {
        "http-embeddings"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Deterministic, network-free provider for unit tests: embeds a
    /// string as its length bucketed across `dimension` slots.
    pub struct DeterministicProvider {
        pub dimension: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for DeterministicProvider {
        async fn embed(&self, texts: &[String], _kind: EmbeddingKind) -> Result<Vec<Vec<f32>>, String> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; self.dimension];
                    for (i, b) in t.bytes().enumerate() {
                        v[i % self.dimension] += b as f32;
                    }
                    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                    if norm > 0.0 {
                        for x in v.iter_mut() {
                            *x /= norm;
                        }
                    }
                    v
                })
                .collect())
        }

        fn name(&self) -> &'static str {
            "deterministic-test-provider"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    pub struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        async fn embed(&self, _texts: &[String], _kind: EmbeddingKind) -> Result<Vec<Vec<f32>>, String> {
            Err("provider unavailable".to_string())
        }

        fn name(&self) -> &'static str {
            "failing-test-provider"
        }

        fn dimension(&self) -> usize {
            8
        }
    }
}
