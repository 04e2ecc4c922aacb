//! Magic-byte + zip-subfile + extension classification (spec.md §4.2).

use std::io::Cursor;

use crate::deadline::Deadline;
use crate::models::DocumentType;

use super::image::OcrProvider;
use super::pdf::PdfExtractor;
use super::{binary, email, image, office, pdf};
use crate::models::Document;

/// Detects the document type from the first bytes, falling back to zip
/// subfile markers for OOXML disambiguation, then filename extension.
/// Never fails: unrecognised input resolves to `DocumentType::Bin`.
pub fn detect_type(bytes: &[u8], filename: &str) -> DocumentType {
    if bytes.starts_with(b"%PDF") {
        return DocumentType::Pdf;
    }
    if bytes.starts_with(b"\x89PNG") {
        return DocumentType::Image;
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return DocumentType::Image;
    }
    if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
        if let Some(t) = detect_ooxml_subtype(bytes) {
            return t;
        }
        return by_extension(filename).unwrap_or(DocumentType::Zip);
    }

    by_extension(filename).unwrap_or(DocumentType::Bin)
}

fn detect_ooxml_subtype(bytes: &[u8]) -> Option<DocumentType> {
    let reader = Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(reader).ok()?;
    for i in 0..archive.len() {
        let entry = archive.by_index(i).ok()?;
        let name = entry.name();
        if name.starts_with("word/") {
            return Some(DocumentType::Docx);
        }
        if name.starts_with("xl/") {
            return Some(DocumentType::Xlsx);
        }
        if name.starts_with("ppt/") {
            return Some(DocumentType::Pptx);
        }
    }
    None
}

pub(crate) fn by_extension(filename: &str) -> Option<DocumentType> {
    let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "pdf" => DocumentType::Pdf,
        "docx" => DocumentType::Docx,
        "xlsx" => DocumentType::Xlsx,
        "pptx" => DocumentType::Pptx,
        "eml" | "msg" => DocumentType::Email,
        "png" | "jpg" | "jpeg" => DocumentType::Image,
        "zip" => DocumentType::Zip,
        "bin" => DocumentType::Bin,
        _ => return None,
    })
}

/// External capabilities the dispatcher delegates to. Constructed once by
/// the coordinator and threaded through to whichever sub-extractor needs
/// it; the dispatcher itself holds no state.
pub struct ExtractorDeps<'a> {
    pub pdf: &'a dyn PdfExtractor,
    pub ocr: &'a dyn OcrProvider,
    pub http: &'a reqwest::Client,
    pub max_risk_score: u8,
    pub strict_sanitize: bool,
    pub preserve_urls: bool,
    /// Clamps sidecar/provider sub-timeouts to whatever remains on the
    /// request deadline (spec.md §5 "Timeouts").
    pub deadline: &'a Deadline,
}

/// Routes to the per-format sub-extractor for `bytes`/`filename`, already
/// detected as `doc_type`. Never returns an error: unsupported types and
/// internal failures both degrade to `Document::fallback`.
pub async fn extract(
    doc_type: DocumentType,
    bytes: &[u8],
    filename: &str,
    deps: &ExtractorDeps<'_>,
) -> Document {
    match doc_type {
        DocumentType::Pdf => pdf::extract(bytes, filename, deps).await,
        DocumentType::Docx | DocumentType::Xlsx | DocumentType::Pptx => {
            office::extract(doc_type, bytes, filename, deps).await
        }
        DocumentType::Email => email::extract(bytes, filename, deps),
        DocumentType::Image => image::extract(bytes, filename, deps).await,
        DocumentType::Bin | DocumentType::Zip => {
            binary::describe(doc_type, filename, bytes.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pdf_by_magic_bytes() {
        assert_eq!(detect_type(b"%PDF-1.4 ...", "upload"), DocumentType::Pdf);
    }

    #[test]
    fn detects_png_by_magic_bytes() {
        assert_eq!(detect_type(b"\x89PNG\r\n\x1a\n", "upload"), DocumentType::Image);
    }

    #[test]
    fn falls_back_to_extension_for_non_zip_bytes() {
        assert_eq!(detect_type(b"hello world", "note.eml"), DocumentType::Email);
    }

    #[test]
    fn unrecognised_bytes_and_extension_is_bin() {
        assert_eq!(detect_type(b"\x00\x01\x02", "data.xyz"), DocumentType::Bin);
    }

    #[test]
    fn extension_only_zip_without_subfiles() {
        assert_eq!(by_extension("archive.zip"), Some(DocumentType::Zip));
    }
}
