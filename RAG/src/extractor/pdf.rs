//! PDF text extraction (spec.md §4.2, §6 `PdfSidecar`).
//!
//! Two interchangeable implementations of `PdfExtractor`: a native one
//! backed by the `pdf-extract` crate (ported from the teacher's
//! `document_processor.rs::process_pdf`), and an HTTP sidecar client
//! matching the `POST /extract-text` contract in spec.md §6. `pdfMethod`
//! picks the primary; when `fallbackEnabled` the coordinator wraps it in
//! a `FallbackPdfExtractor` that tries the other backend once the
//! primary fails or returns no pages.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::deadline::Deadline;
use crate::extractor::dispatch::ExtractorDeps;
use crate::models::{Document, DocumentType};
use crate::sanitizer::{sanitize_for_ai, SanitizeSource};

/// A page-preserving PDF text extractor.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    /// `deadline` clamps any network sub-timeout the implementation uses;
    /// in-process extractors may ignore it.
    async fn extract_pages(&self, bytes: &[u8], deadline: &Deadline) -> Result<Vec<String>, String>;

    /// Identifies the extractor in logs / `method` reporting.
    fn name(&self) -> &'static str;
}

/// In-process extraction via `pdf-extract`. Does not preserve page
/// boundaries natively, so the whole document is treated as a single
/// page when this backend is used alone (sidecar extraction below is
/// the one that reports true per-page text).
pub struct NativePdfExtractor;

#[async_trait]
impl PdfExtractor for NativePdfExtractor {
    async fn extract_pages(&self, bytes: &[u8], _deadline: &Deadline) -> Result<Vec<String>, String> {
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
        .map(|text| vec![text])
    }

    fn name(&self) -> &'static str {
        "unpdf"
    }
}

/// HTTP sidecar client for the `python-pymupdf` service (spec.md §6).
pub struct SidecarPdfExtractor {
    pub base_url: String,
    pub timeout_ms: u64,
}

/// Tries `primary` first, then `fallback` once if the primary errors or
/// returns no pages (spec.md §4.2, `textExtraction.fallbackEnabled`).
pub struct FallbackPdfExtractor {
    primary: std::sync::Arc<dyn PdfExtractor>,
    fallback: std::sync::Arc<dyn PdfExtractor>,
}

impl FallbackPdfExtractor {
    pub fn new(primary: std::sync::Arc<dyn PdfExtractor>, fallback: std::sync::Arc<dyn PdfExtractor>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PdfExtractor for FallbackPdfExtractor {
    async fn extract_pages(&self, bytes: &[u8], deadline: &Deadline) -> Result<Vec<String>, String> {
        match self.primary.extract_pages(bytes, deadline).await {
            Ok(pages) if !pages.is_empty() => Ok(pages),
            _ => self.fallback.extract_pages(bytes, deadline).await,
        }
    }

    fn name(&self) -> &'static str {
        self.primary.name()
    }
}

#[derive(Debug, Deserialize)]
struct SidecarPage {
    #[allow(dead_code)]
    page_number: usize,
    text: String,
    #[allow(dead_code)]
    char_count: usize,
}

#[derive(Debug, Deserialize)]
struct SidecarResponse {
    success: bool,
    pages: Vec<SidecarPage>,
}

#[async_trait]
impl PdfExtractor for SidecarPdfExtractor {
    async fn extract_pages(&self, bytes: &[u8], deadline: &Deadline) -> Result<Vec<String>, String> {
        let client = reqwest::Client::new();
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("document.pdf");
        let form = reqwest::multipart::Form::new().part("file", part);

        let timeout = deadline.clamp(Duration::from_millis(self.timeout_ms));
        let resp = client
            .post(format!("{}/extract-text", self.base_url))
            .timeout(timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("sidecar returned status {}", resp.status()));
        }

        let body: SidecarResponse = resp.json().await.map_err(|e| e.to_string())?;
        if !body.success {
            return Err("sidecar reported failure".to_string());
        }
        Ok(body.pages.into_iter().map(|p| p.text).collect())
    }

    fn name(&self) -> &'static str {
        "python-pymupdf"
    }
}

pub async fn extract(bytes: &[u8], filename: &str, deps: &ExtractorDeps<'_>) -> Document {
    let pages = match deps.pdf.extract_pages(bytes, deps.deadline).await {
        Ok(pages) if !pages.is_empty() => pages,
        Ok(_) => {
            return Document::fallback(DocumentType::Pdf, filename, "extractor returned no pages")
        }
        Err(reason) => return Document::fallback(DocumentType::Pdf, filename, &reason),
    };

    let sanitized_pages: Vec<String> = pages
        .iter()
        .map(|p| {
            sanitize_for_ai(
                p,
                SanitizeSource::Pdf,
                deps.max_risk_score,
                deps.strict_sanitize,
                deps.preserve_urls,
            )
            .sanitized_content
        })
        .collect();

    let full_text = sanitized_pages.join("\n---\n");
    Document {
        filename: filename.to_string(),
        doc_type: DocumentType::Pdf,
        total_pages: sanitized_pages.len(),
        full_text,
        page_texts: sanitized_pages,
        chunks: Vec::new(),
    }
}
