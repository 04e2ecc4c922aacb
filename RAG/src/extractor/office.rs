//! DOCX/XLSX/PPTX extraction with semantic (token-bounded) chunking
//! (spec.md §4.2). Uses the `zip` crate to read OOXML subfiles and a
//! tag-stripping regex to pull plain text out of the XML payload, in the
//! same regex-first style the teacher uses for its own text cleanup
//! (`document_processor.rs::clean_text`).

use std::io::{Cursor, Read};

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::extractor::dispatch::ExtractorDeps;
use crate::models::{Document, DocumentType};
use crate::sanitizer::{sanitize_for_ai, SanitizeSource};

const MAX_TOKENS_PER_CHUNK: usize = 1000;
const MIN_TOKENS_PER_CHUNK: usize = 200;
const OVERLAP_SENTENCES: usize = 2;
const OVERLAP_ROWS: usize = 2;

fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + 3) / 4
}

fn tag_stripper() -> Regex {
    Regex::new(r"<[^>]+>").unwrap()
}

fn collapse_whitespace(text: &str) -> String {
    Regex::new(r"\s+").unwrap().replace_all(text.trim(), " ").into_owned()
}

fn read_zip_xml_matching(bytes: &[u8], prefix_predicate: impl Fn(&str) -> bool) -> Vec<String> {
    let reader = Cursor::new(bytes);
    let mut archive = match zip::ZipArchive::new(reader) {
        Ok(a) => a,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = (0..archive.len())
        .filter_map(|i| {
            let entry = archive.by_index(i).ok()?;
            let name = entry.name().to_string();
            prefix_predicate(&name).then_some(name)
        })
        .collect();
    names.sort();

    let stripper = tag_stripper();
    let mut texts = Vec::new();
    for name in names {
        if let Ok(mut entry) = archive.by_name(&name) {
            let mut xml = String::new();
            if entry.read_to_string(&mut xml).is_ok() {
                let plain = stripper.replace_all(&xml, " ");
                texts.push(collapse_whitespace(&plain));
            }
        }
    }
    texts
}

fn extract_docx_text(bytes: &[u8]) -> Option<String> {
    let parts = read_zip_xml_matching(bytes, |name| name == "word/document.xml");
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("\n"))
}

/// Returns one string per slide.
fn extract_pptx_slides(bytes: &[u8]) -> Vec<String> {
    read_zip_xml_matching(bytes, |name| {
        name.starts_with("ppt/slides/slide") && name.ends_with(".xml")
    })
}

/// Returns one string per worksheet (each containing all rows for that
/// sheet, newline-delimited for later row-wise chunking).
fn extract_xlsx_sheets(bytes: &[u8]) -> Vec<String> {
    read_zip_xml_matching(bytes, |name| {
        name.starts_with("xl/worksheets/sheet") && name.ends_with(".xml")
    })
}

/// Splits `text` into sentence-bounded chunks of at most
/// `MAX_TOKENS_PER_CHUNK` estimated tokens, each overlapping the previous
/// by `OVERLAP_SENTENCES` sentences. A final chunk smaller than
/// `MIN_TOKENS_PER_CHUNK` is merged into its predecessor when one exists.
fn chunk_by_sentences(text: &str) -> Vec<String> {
    let sentences: Vec<&str> = text.unicode_sentences().collect();
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for sentence in &sentences {
        let tokens = estimate_tokens(sentence);
        if current_tokens + tokens > MAX_TOKENS_PER_CHUNK && !current.is_empty() {
            chunks.push(current.join(" "));
            let overlap_start = current.len().saturating_sub(OVERLAP_SENTENCES);
            current = current[overlap_start..].to_vec();
            current_tokens = current.iter().map(|s| estimate_tokens(s)).sum();
        }
        current.push(sentence);
        current_tokens += tokens;
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    merge_undersized_tail(chunks)
}

/// Same idea as `chunk_by_sentences` but the unit is a row (newline) and
/// overlap is `OVERLAP_ROWS` rows, matching the XLSX-specific constant.
fn chunk_by_rows(text: &str) -> Vec<String> {
    let rows: Vec<&str> = text.split('\n').filter(|r| !r.trim().is_empty()).collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for row in &rows {
        let tokens = estimate_tokens(row);
        if current_tokens + tokens > MAX_TOKENS_PER_CHUNK && !current.is_empty() {
            chunks.push(current.join("\n"));
            let overlap_start = current.len().saturating_sub(OVERLAP_ROWS);
            current = current[overlap_start..].to_vec();
            current_tokens = current.iter().map(|r| estimate_tokens(r)).sum();
        }
        current.push(row);
        current_tokens += tokens;
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }

    merge_undersized_tail(chunks)
}

fn merge_undersized_tail(mut chunks: Vec<String>) -> Vec<String> {
    if chunks.len() >= 2 {
        let last_tokens = estimate_tokens(chunks.last().unwrap());
        if last_tokens < MIN_TOKENS_PER_CHUNK {
            let last = chunks.pop().unwrap();
            let prev = chunks.last_mut().unwrap();
            prev.push(' ');
            prev.push_str(&last);
        }
    }
    chunks
}

pub async fn extract(
    doc_type: DocumentType,
    bytes: &[u8],
    filename: &str,
    deps: &ExtractorDeps<'_>,
) -> Document {
    let raw_pages: Vec<String> = match doc_type {
        DocumentType::Docx => match extract_docx_text(bytes) {
            Some(text) => chunk_by_sentences(&text),
            None => return Document::fallback(doc_type, filename, "could not read word/document.xml"),
        },
        DocumentType::Pptx => {
            let slides = extract_pptx_slides(bytes);
            if slides.is_empty() {
                return Document::fallback(doc_type, filename, "no slides found in archive");
            }
            slides
                .iter()
                .flat_map(|slide| chunk_by_sentences(slide))
                .collect()
        }
        DocumentType::Xlsx => {
            let sheets = extract_xlsx_sheets(bytes);
            if sheets.is_empty() {
                return Document::fallback(doc_type, filename, "no worksheets found in archive");
            }
            sheets.iter().flat_map(|sheet| chunk_by_rows(sheet)).collect()
        }
        _ => unreachable!("office::extract only handles docx/xlsx/pptx"),
    };

    if raw_pages.is_empty() {
        return Document::fallback(doc_type, filename, "no extractable text");
    }

    let source = match doc_type {
        DocumentType::Docx => SanitizeSource::Docx,
        DocumentType::Xlsx => SanitizeSource::Xlsx,
        DocumentType::Pptx => SanitizeSource::Pptx,
        _ => SanitizeSource::Document,
    };

    let sanitized_pages: Vec<String> = raw_pages
        .iter()
        .map(|p| {
            sanitize_for_ai(p, source, deps.max_risk_score, deps.strict_sanitize, deps.preserve_urls)
                .sanitized_content
        })
        .collect();

    let full_text = sanitized_pages.join("\n---\n");
    Document {
        filename: filename.to_string(),
        doc_type,
        total_pages: sanitized_pages.len(),
        full_text,
        page_texts: sanitized_pages,
        chunks: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_matches_ceil_chars_over_4() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn chunk_by_sentences_respects_token_ceiling() {
        let sentence = "word ".repeat(50); // ~250 chars -> ~63 tokens
        let text = sentence.repeat(20); // comfortably over MAX_TOKENS_PER_CHUNK once repeated
        let chunks = chunk_by_sentences(&text);
        for chunk in &chunks {
            assert!(estimate_tokens(chunk) <= MAX_TOKENS_PER_CHUNK + MAX_TOKENS_PER_CHUNK / 4);
        }
    }

    #[test]
    fn chunk_by_rows_splits_on_newlines() {
        let text = (0..500).map(|i| format!("row {i} has some content")).collect::<Vec<_>>().join("\n");
        let chunks = chunk_by_rows(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_by_sentences("").is_empty());
        assert!(chunk_by_rows("").is_empty());
    }
}
