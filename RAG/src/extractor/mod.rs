//! Format dispatch and per-format text extraction (spec.md §4.2, C2).
//!
//! `dispatch::detect_type` classifies bytes+filename; `dispatch::extract`
//! routes to the matching sub-extractor. Every sub-extractor degrades to
//! `Document::fallback` on failure instead of propagating an error, and
//! every extracted page is piped through `sanitizer::sanitize_for_ai`
//! before it reaches the rest of the pipeline.

pub mod binary;
pub mod dispatch;
pub mod email;
pub mod image;
pub mod office;
pub mod pdf;

pub use dispatch::{detect_type, extract};
pub use image::OcrProvider;
pub use pdf::PdfExtractor;
