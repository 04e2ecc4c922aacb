//! QA orchestrator (spec.md §4.7, C7): the three answering paths plus
//! the per-question concurrency and state machine that ties them to the
//! global deadline. Fan-out follows the same
//! `Semaphore`-bounded-spawn-then-`join_all` shape as
//! `examples/other_examples/38d256a0_foofork-riptidecrawler__.../pipeline.rs`.

use std::sync::Arc;

use futures::future::join_all;
use regex::Regex;
use tokio::sync::Semaphore;

use crate::config::StreamingConfig;
use crate::deadline::Deadline;
use crate::llm::{ChatMessage, LlmProvider};
use crate::models::{
    ScoredChunk, CRITICAL_RISK_PLACEHOLDER, GENERIC_ERROR_PLACEHOLDER, GROUNDING_FALLBACK,
    TIMEOUT_PLACEHOLDER,
};

/// Caps in-flight LLM streams; spec.md §5 requires at most one stream per
/// question but otherwise leaves the provider-level cap unspecified.
const MAX_CONCURRENT_QUESTIONS: usize = 8;

const RAG_SYSTEM_PROMPT: &str = "You are a careful retrieval-augmented analyst. Answer the question using only the supplied excerpts. When you state a fact, cite the page it came from using the exact marker shown before that excerpt, e.g. [Page No. 12]. If the excerpts do not contain enough information to answer, respond with exactly this sentence and nothing else: \"The provided document does not contain information to answer this question.\"";

const SMALL_DOC_SYSTEM_PROMPT: &str = "You are a careful document analyst. Answer the question using only the provided document text. If the document does not contain enough information to answer, say so clearly.";

const IMAGE_SYSTEM_PROMPT: &str = "You are a careful document analyst reading OCR-extracted text from a single scanned image. Answer the question using only that text.";

/// Per-question outcome terminal states (spec.md §4.7). `Done` carries
/// the normalised answer text; the other two map to fixed placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionOutcome {
    Done(String),
    TimedOut,
    Errored,
}

impl QuestionOutcome {
    pub fn into_answer(self) -> String {
        match self {
            QuestionOutcome::Done(text) => text,
            QuestionOutcome::TimedOut => TIMEOUT_PLACEHOLDER.to_string(),
            QuestionOutcome::Errored => GENERIC_ERROR_PLACEHOLDER.to_string(),
        }
    }
}

pub struct Orchestrator {
    primary: Arc<dyn LlmProvider>,
    secondary: Option<Arc<dyn LlmProvider>>,
    enable_llm_racing: bool,
    #[allow(dead_code)]
    streaming: StreamingConfig,
}

impl Orchestrator {
    pub fn new(
        primary: Arc<dyn LlmProvider>,
        secondary: Option<Arc<dyn LlmProvider>>,
        enable_llm_racing: bool,
        streaming: StreamingConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            enable_llm_racing,
            streaming,
        }
    }

    /// Splits question indices across primary/secondary as a **partition**
    /// (spec.md §9: not race-to-first) when racing is enabled. XLSX
    /// documents route to the secondary provider outright (spec.md §9:
    /// "Primary + optional secondary (Claude for XLSX; racing for
    /// others)"), bypassing the parity split.
    fn provider_for(&self, index: usize, prefer_secondary: bool) -> Arc<dyn LlmProvider> {
        if let Some(secondary) = &self.secondary {
            if prefer_secondary {
                return secondary.clone();
            }
            if self.enable_llm_racing && index % 2 == 1 {
                return secondary.clone();
            }
        }
        self.primary.clone()
    }

    /// **(a) Image path**: single OCR-text prompt per question, no
    /// retrieval, no embedding.
    pub async fn answer_image_path(
        &self,
        ocr_text: &str,
        questions: &[String],
        deadline: &Deadline,
    ) -> Vec<String> {
        self.answer_with_fixed_context(IMAGE_SYSTEM_PROMPT, ocr_text, questions, deadline)
            .await
    }

    /// **(b) Small-document path**: whole `fullText` as context, bypasses
    /// vector search entirely.
    pub async fn answer_small_document_path(
        &self,
        full_text: &str,
        questions: &[String],
        deadline: &Deadline,
    ) -> Vec<String> {
        self.answer_with_fixed_context(SMALL_DOC_SYSTEM_PROMPT, full_text, questions, deadline)
            .await
    }

    async fn answer_with_fixed_context(
        &self,
        system_prompt: &str,
        context: &str,
        questions: &[String],
        deadline: &Deadline,
    ) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_QUESTIONS));
        let futures = questions.iter().enumerate().map(|(i, question)| {
            let semaphore = semaphore.clone();
            let provider = self.provider_for(i, false);
            let user = format!("DOCUMENT TEXT:\n{context}\n\nQUESTION: {question}");
            let system = system_prompt.to_string();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                answer_one(provider, system, user, deadline).await.into_answer()
            }
        });
        join_all(futures).await
    }

    /// **(c) Retrieval path**: per-question embed-or-reuse, top-k search,
    /// prompt composition with `[Page No. X]` excerpts, stream, normalise.
    /// `prefer_secondary` routes every question to the secondary provider
    /// outright; the coordinator sets it for XLSX documents.
    pub async fn answer_retrieval_path(
        &self,
        questions: &[String],
        retrieved: &[Vec<ScoredChunk>],
        deadline: &Deadline,
        prefer_secondary: bool,
    ) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_QUESTIONS));
        let futures = questions.iter().enumerate().map(|(i, question)| {
            let semaphore = semaphore.clone();
            let provider = self.provider_for(i, prefer_secondary);
            let excerpts = compose_excerpts(&retrieved[i]);
            let user = format!("<excerpts>\n{excerpts}</excerpts>\n\n<question>\n{question}\n</question>");
            let system = RAG_SYSTEM_PROMPT.to_string();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                answer_one(provider, system, user, deadline).await.into_answer()
            }
        });
        join_all(futures).await
    }

    /// Blocked-question fast path: a critical-risk question never reaches
    /// the LLM (spec.md §4.1).
    pub fn blocked_answer() -> String {
        CRITICAL_RISK_PLACEHOLDER.to_string()
    }

    /// Used by the coordinator when a question has no retrievable
    /// content at all (empty document, empty index).
    pub fn grounding_fallback() -> String {
        GROUNDING_FALLBACK.to_string()
    }
}

async fn answer_one(
    provider: Arc<dyn LlmProvider>,
    system: String,
    user: String,
    deadline: &Deadline,
) -> QuestionOutcome {
    let message = ChatMessage { system, user };
    match deadline.race(provider.complete(message)).await {
        None => QuestionOutcome::TimedOut,
        Some(Ok(text)) => QuestionOutcome::Done(normalize_whitespace(&text)),
        Some(Err(_)) => QuestionOutcome::Errored,
    }
}

fn compose_excerpts(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| format!("[Page No. {}]\n{}\n", c.chunk.page_number, c.chunk.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapses newlines and runs of whitespace to single spaces, trims
/// (spec.md §4.7 step 5).
fn normalize_whitespace(text: &str) -> String {
    Regex::new(r"\s+").unwrap().replace_all(text.trim(), " ").into_owned()
}
