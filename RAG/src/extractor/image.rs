//! Image extraction (spec.md §4.2, §6 `OCR.extract`): delegates to an
//! external OCR capability and returns a single-page document. The core
//! crate only defines the capability boundary; a real OCR backend is
//! wired in by the binary crate.

use async_trait::async_trait;
use base64::Engine;

use crate::extractor::dispatch::ExtractorDeps;
use crate::models::{Document, DocumentType};
use crate::sanitizer::{sanitize_for_ai, SanitizeSource};

/// OCR capability boundary (spec.md §6): `extract(bytes) -> text`.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn extract_text(&self, image_bytes: &[u8]) -> Result<String, String>;
}

/// Stand-in for environments with no OCR backend configured; always
/// reports failure so callers fall through to `Document::fallback`.
pub struct NoopOcr;

#[async_trait]
impl OcrProvider for NoopOcr {
    async fn extract_text(&self, _image_bytes: &[u8]) -> Result<String, String> {
        Err("no OCR backend configured".to_string())
    }
}

/// HTTP OCR client that POSTs a data-URI payload, matching the
/// `OCR.extract(bytes) -> text` contract (spec.md §6).
pub struct HttpOcr {
    pub endpoint: String,
    pub mime_type: &'static str,
}

#[async_trait]
impl OcrProvider for HttpOcr {
    async fn extract_text(&self, image_bytes: &[u8]) -> Result<String, String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let data_uri = format!("data:{};base64,{}", self.mime_type, encoded);

        let client = reqwest::Client::new();
        let resp = client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "image": data_uri }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("ocr service returned status {}", resp.status()));
        }

        #[derive(serde::Deserialize)]
        struct OcrResponse {
            text: String,
        }
        let body: OcrResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(body.text)
    }
}

pub async fn extract(bytes: &[u8], filename: &str, deps: &ExtractorDeps<'_>) -> Document {
    let text = match deps.ocr.extract_text(bytes).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => return Document::fallback(DocumentType::Image, filename, "ocr returned no text"),
        Err(reason) => return Document::fallback(DocumentType::Image, filename, &reason),
    };

    let sanitized = sanitize_for_ai(
        &text,
        SanitizeSource::Document,
        deps.max_risk_score,
        deps.strict_sanitize,
        deps.preserve_urls,
    );

    Document {
        filename: filename.to_string(),
        doc_type: DocumentType::Image,
        total_pages: 1,
        full_text: sanitized.sanitized_content.clone(),
        page_texts: vec![sanitized.sanitized_content],
        chunks: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubOcr(&'static str);

    #[async_trait]
    impl OcrProvider for StubOcr {
        async fn extract_text(&self, _bytes: &[u8]) -> Result<String, String> {
            Ok(self.0.to_string())
        }
    }

    fn test_deadline() -> crate::deadline::Deadline {
        crate::deadline::DeadlineRegistry::new().start(uuid::Uuid::new_v4(), Some(5.0))
    }

    #[tokio::test]
    async fn ocr_text_becomes_single_page_document() {
        let ocr = StubOcr("invoice total: $42");
        let pdf = crate::extractor::pdf::NativePdfExtractor;
        let http = reqwest::Client::new();
        let deadline = test_deadline();
        let deps = ExtractorDeps {
            pdf: &pdf,
            ocr: &ocr,
            http: &http,
            max_risk_score: 50,
            strict_sanitize: false,
            preserve_urls: true,
            deadline: &deadline,
        };
        let document = extract(b"\x89PNG", "scan.png", &deps).await;
        assert_eq!(document.total_pages, 1);
        assert!(document.full_text.contains("$42"));
    }

    #[tokio::test]
    async fn noop_ocr_yields_fallback() {
        let ocr = NoopOcr;
        let pdf = crate::extractor::pdf::NativePdfExtractor;
        let http = reqwest::Client::new();
        let deadline = test_deadline();
        let deps = ExtractorDeps {
            pdf: &pdf,
            ocr: &ocr,
            http: &http,
            max_risk_score: 50,
            strict_sanitize: false,
            preserve_urls: true,
            deadline: &deadline,
        };
        let document = extract(b"\x89PNG", "scan.png", &deps).await;
        assert!(document.full_text.contains("extraction failed"));
    }
}
