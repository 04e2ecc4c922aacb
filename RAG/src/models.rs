//! Core data model shared by every pipeline component (spec.md §3).

use serde::{Deserialize, Serialize};

/// Detected document format (spec.md §3, "Document").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Email,
    Image,
    Xlsx,
    Pptx,
    Bin,
    Zip,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
            DocumentType::Email => "email",
            DocumentType::Image => "image",
            DocumentType::Xlsx => "xlsx",
            DocumentType::Pptx => "pptx",
            DocumentType::Bin => "bin",
            DocumentType::Zip => "zip",
        }
    }

    /// URL-only types carry no chunkable content; answer synthesis falls
    /// back to a metadata report (spec.md §3, "Document" invariant).
    pub fn is_url_only(&self) -> bool {
        matches!(self, DocumentType::Bin | DocumentType::Zip)
    }
}

/// A fully processed document, owned exclusively by the request coordinator
/// for the lifetime of one request (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub total_pages: usize,
    pub full_text: String,
    pub page_texts: Vec<String>,
    pub chunks: Vec<DocumentChunk>,
}

impl Document {
    pub fn fallback(doc_type: DocumentType, filename: impl Into<String>, reason: &str) -> Self {
        let text = format!("[{} extraction failed: {}]", doc_type.as_str(), reason);
        Self {
            filename: filename.into(),
            doc_type,
            total_pages: 1,
            full_text: text.clone(),
            page_texts: vec![text],
            chunks: Vec::new(),
        }
    }
}

/// Chunk type recorded in metadata. spec.md §9 open question: only two
/// values are enumerated even though three chunking strategies exist;
/// recursive chunks record themselves as `CharacterWise` for compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkType {
    PageWise,
    CharacterWise,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_type: Option<ChunkType>,
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    pub pages_in_chunk: Option<usize>,
    pub actual_page_number: Option<usize>,
    pub end_page_number: Option<usize>,
    pub character_count: Option<usize>,
    /// Informational only (spec.md §4.3, recursive strategy).
    pub looks_like_complete_sentence: Option<bool>,
    pub starts_on_paragraph_boundary: Option<bool>,
    pub ends_on_paragraph_boundary: Option<bool>,
}

/// A bounded-length text fragment and the unit of retrieval (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: uuid::Uuid,
    pub page_number: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(page_number: usize, content: String, metadata: ChunkMetadata) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            page_number,
            content,
            metadata,
        }
    }
}

/// A chunk paired with its embedding vector (spec.md §3, "Embedded chunk").
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk_id: uuid::Uuid,
    pub vector: Vec<f32>,
    pub chunk: DocumentChunk,
}

/// Prompt-injection risk band (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => RiskLevel::Low,
            25..=49 => RiskLevel::Medium,
            50..=74 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub risk: RiskLevel,
    pub detected_patterns: Vec<String>,
}

impl RiskAssessment {
    pub fn none() -> Self {
        Self {
            score: 0,
            risk: RiskLevel::Low,
            detected_patterns: Vec::new(),
        }
    }
}

/// Source document kind passed to `sanitizeForAI` (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeSource {
    Pdf,
    Docx,
    Email,
    Pptx,
    Xlsx,
    Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReport {
    pub initial_risk_score: u8,
    pub final_risk_score: u8,
    pub risk_reduction_percent: f32,
    pub is_safe: bool,
    pub applied_filters: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SanitizeForAiResult {
    pub sanitized_content: String,
    pub security_report: SecurityReport,
}

/// Memory usage report for the vector index (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMemoryReport {
    pub chunk_count: usize,
    pub estimated_memory_mb: f64,
}

/// A retrieval hit: a chunk and its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

pub const TIMEOUT_PLACEHOLDER: &str = "I apologize, but I wasn't able to complete the response within the time limit. Please try again with a more specific question.";
pub const GENERIC_ERROR_PLACEHOLDER: &str =
    "I apologize, but there was an error processing your question.";
pub const CRITICAL_RISK_PLACEHOLDER: &str = "I cannot process this question as it contains potentially harmful content. Please rephrase your question.";
pub const NO_READABLE_CONTENT_PLACEHOLDER: &str = "I couldn't extract any readable content from the provided URL. Please share a document or a different link.";
pub const OVERSIZE_URL_PLACEHOLDER: &str = "Document Rejected! File too large";
pub const GROUNDING_FALLBACK: &str =
    "The provided document does not contain information to answer this question.";
