//! `.bin`/`.zip` URL handling (spec.md §4.2, §4.8 step 6).
//!
//! Per spec.md §9's open question, the coordinator rejects every
//! `.bin`/`.zip` document URL outright before this module is ever
//! reached in the live request path — the metadata-report behaviour
//! below exists for the extractor's own contract and for direct/offline
//! use of the dispatcher, not for the hot path.

use crate::models::{Document, DocumentType};

/// Builds the `"[bin/zip extraction failed: ...]"`-style placeholder used
/// when `describe` is invoked without first having fetched headers.
pub fn describe(doc_type: DocumentType, filename: &str, byte_len: usize) -> Document {
    let text = format!(
        "[{} metadata report] filename={} size_bytes={} (content not downloaded per policy)",
        doc_type.as_str(),
        filename,
        byte_len,
    );
    Document {
        filename: filename.to_string(),
        doc_type,
        total_pages: 0,
        full_text: text.clone(),
        page_texts: vec![text],
        chunks: Vec::new(),
    }
}

/// Metadata gathered without downloading the resource body (spec.md
/// §4.2): `HEAD`, falling back to a ranged `GET`, falling back to a
/// plain `GET` whose body is discarded.
pub async fn fetch_metadata_report(
    client: &reqwest::Client,
    url: &str,
    doc_type: DocumentType,
) -> Document {
    let headers = match head_or_ranged_get(client, url).await {
        Some(h) => h,
        None => {
            return Document::fallback(doc_type, url, "could not retrieve headers for bin/zip url")
        }
    };

    let text = format!(
        "[{} metadata report] url={} content_length={} content_type={} last_modified={} server={}",
        doc_type.as_str(),
        url,
        headers.content_length.as_deref().unwrap_or("unknown"),
        headers.content_type.as_deref().unwrap_or("unknown"),
        headers.last_modified.as_deref().unwrap_or("unknown"),
        headers.server.as_deref().unwrap_or("unknown"),
    );

    Document {
        filename: url.to_string(),
        doc_type,
        total_pages: 0,
        full_text: text.clone(),
        page_texts: vec![text],
        chunks: Vec::new(),
    }
}

struct ResourceHeaders {
    content_length: Option<String>,
    content_type: Option<String>,
    last_modified: Option<String>,
    server: Option<String>,
}

fn extract_headers(resp: &reqwest::Response) -> ResourceHeaders {
    let get = |name: &str| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };
    ResourceHeaders {
        content_length: get("content-length"),
        content_type: get("content-type"),
        last_modified: get("last-modified"),
        server: get("server"),
    }
}

async fn head_or_ranged_get(client: &reqwest::Client, url: &str) -> Option<ResourceHeaders> {
    if let Ok(resp) = client.head(url).send().await {
        if resp.status().is_success() {
            return Some(extract_headers(&resp));
        }
    }

    if let Ok(resp) = client
        .get(url)
        .header(reqwest::header::RANGE, "bytes=0-0")
        .send()
        .await
    {
        if resp.status().is_success() || resp.status().as_u16() == 206 {
            return Some(extract_headers(&resp));
        }
    }

    if let Ok(resp) = client.get(url).send().await {
        if resp.status().is_success() {
            return Some(extract_headers(&resp));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_reports_size_without_content() {
        let document = describe(DocumentType::Zip, "archive.zip", 4096);
        assert_eq!(document.total_pages, 0);
        assert!(document.full_text.contains("4096"));
        assert!(document.chunks.is_empty());
    }
}
