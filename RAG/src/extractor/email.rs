//! `.eml`/`.msg` extraction (spec.md §4.2): header extraction by regex,
//! reply-quote stripping, headers + visible body concatenated into a
//! single page.

use regex::Regex;

use crate::extractor::dispatch::ExtractorDeps;
use crate::models::{Document, DocumentType};
use crate::sanitizer::{sanitize_for_ai, SanitizeSource};

fn header(text: &str, name: &str) -> Option<String> {
    let pattern = format!(r"(?im)^{name}\s*:\s*(.+)$");
    Regex::new(&pattern).ok()?.captures(text).map(|c| c[1].trim().to_string())
}

/// Strips quoted-reply content (`> ...` lines and everything after an
/// "On ... wrote:" marker) to keep only the visible body.
fn strip_quoted_reply(body: &str) -> String {
    let on_wrote = Regex::new(r"(?m)^On .+ wrote:\s*$").unwrap();
    let body = match on_wrote.find(body) {
        Some(m) => &body[..m.start()],
        None => body,
    };

    body.lines()
        .filter(|line| !line.trim_start().starts_with('>'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn split_headers_and_body(text: &str) -> (&str, &str) {
    match text.find("\r\n\r\n").or_else(|| text.find("\n\n")) {
        Some(idx) => {
            let sep_len = if text[idx..].starts_with("\r\n\r\n") { 4 } else { 2 };
            (&text[..idx], &text[idx + sep_len..])
        }
        None => (text, ""),
    }
}

pub fn extract(bytes: &[u8], filename: &str, deps: &ExtractorDeps<'_>) -> Document {
    let text = String::from_utf8_lossy(bytes);
    let (header_block, raw_body) = split_headers_and_body(&text);

    let from = header(header_block, "From").unwrap_or_else(|| "(unknown)".to_string());
    let to = header(header_block, "To").unwrap_or_else(|| "(unknown)".to_string());
    let subject = header(header_block, "Subject").unwrap_or_else(|| "(no subject)".to_string());
    let date = header(header_block, "Date").unwrap_or_else(|| "(unknown)".to_string());

    let body = strip_quoted_reply(raw_body);
    if body.is_empty() && from == "(unknown)" && subject == "(no subject)" {
        return Document::fallback(DocumentType::Email, filename, "no headers or body found");
    }

    let combined = format!(
        "From: {from}\nTo: {to}\nSubject: {subject}\nDate: {date}\n\n{body}"
    );

    let sanitized = sanitize_for_ai(
        &combined,
        SanitizeSource::Email,
        deps.max_risk_score,
        deps.strict_sanitize,
        deps.preserve_urls,
    );

    Document {
        filename: filename.to_string(),
        doc_type: DocumentType::Email,
        total_pages: 1,
        full_text: sanitized.sanitized_content.clone(),
        page_texts: vec![sanitized.sanitized_content],
        chunks: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::image::NoopOcr;
    use crate::extractor::pdf::NativePdfExtractor;

    fn deps() -> (NativePdfExtractor, NoopOcr, reqwest::Client) {
        (NativePdfExtractor, NoopOcr, reqwest::Client::new())
    }

    #[test]
    fn extracts_headers_and_body() {
        let (pdf, ocr, http) = deps();
        let registry = crate::deadline::DeadlineRegistry::new();
        let deadline = registry.start(uuid::Uuid::new_v4(), Some(5.0));
        let d = ExtractorDeps {
            pdf: &pdf,
            ocr: &ocr,
            http: &http,
            max_risk_score: 50,
            strict_sanitize: false,
            preserve_urls: true,
            deadline: &deadline,
        };
        let raw = b"From: alice@example.com\nTo: bob@example.com\nSubject: Hello\nDate: Mon, 1 Jan 2024\n\nHi Bob, see attached.";
        let document = extract(raw, "note.eml", &d);
        assert_eq!(document.total_pages, 1);
        assert!(document.full_text.contains("alice@example.com"));
        assert!(document.full_text.contains("Hi Bob"));
    }

    #[test]
    fn strips_quoted_reply_chain() {
        let body = "Sounds good.\n\nOn Mon, Jan 1, 2024 Bob wrote:\n> original message\n> more quoted text";
        let stripped = strip_quoted_reply(body);
        assert_eq!(stripped, "Sounds good.");
    }
}
