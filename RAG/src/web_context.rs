//! `WebContextProvider`: the non-document-URL branch's external
//! collaborator (spec.md §4.8 step 4, §6 `WebContext.enrich`).

use async_trait::async_trait;

use crate::deadline::Deadline;

/// A scraped excerpt ingested into the index the same way a document
/// chunk would be.
#[derive(Debug, Clone)]
pub struct WebChunk {
    pub title: String,
    pub content: String,
}

/// Fetches and chunks a non-document URL (spec.md §4.8 step 4: the
/// coordinator calls this with the request's own URL, not a question,
/// once it determines the URL has no recognised document extension).
#[async_trait]
pub trait WebContextProvider: Send + Sync {
    async fn enrich(&self, url: &str, deadline: &Deadline) -> Vec<WebChunk>;
}

/// No scraping backend configured; always returns no chunks, which the
/// coordinator maps to the "couldn't extract readable content"
/// placeholder (spec.md §7).
pub struct NoopWebContext;

#[async_trait]
impl WebContextProvider for NoopWebContext {
    async fn enrich(&self, _url: &str, _deadline: &Deadline) -> Vec<WebChunk> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::DeadlineRegistry;
    use uuid::Uuid;

    #[tokio::test]
    async fn noop_provider_never_returns_chunks() {
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), Some(5.0));
        let provider = NoopWebContext;
        let chunks = provider.enrich("https://example.com/about", &deadline).await;
        assert!(chunks.is_empty());
    }
}
