//! Embedding pipeline (spec.md §4.4, C4).

mod client;
mod provider;

pub use client::EmbeddingClient;
pub use provider::{EmbeddingKind, EmbeddingProvider, HttpEmbeddingProvider};

#[cfg(test)]
pub use provider::test_support;
