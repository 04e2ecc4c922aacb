//! Request/response shapes for the HTTP surface (spec.md §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct HackRxRequest {
    pub documents: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswersResponse {
    pub answers: Vec<String>,
}

/// `/api/v1/process-pdf` returns a plain message instead of answers when
/// no `questions` part was supplied (spec.md §6).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProcessPdfResponse {
    Answers { answers: Vec<String> },
    Message { message: String },
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
