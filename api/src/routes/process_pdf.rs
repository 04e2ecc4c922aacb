use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use uuid::Uuid;

use rag_system::coordinator::DocumentsInput;

use crate::dto::ProcessPdfResponse;
use crate::error::ApiError;
use crate::state::AppState;

const ACCEPTED_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "pptx", "xlsx", "eml", "msg", "png", "jpg", "jpeg",
];

fn has_accepted_extension(filename: &str) -> bool {
    filename
        .rsplit('.')
        .next()
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// `POST /api/v1/process-pdf` (spec.md §6): multipart `pdf` file plus an
/// optional `questions` JSON-array-string part. Answers back if questions
/// were supplied, otherwise a plain acknowledgement message.
pub async fn process_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessPdfResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let max_upload_bytes = state.config.server.max_upload_bytes;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename = String::new();
    let mut questions: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "pdf" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read upload: {e}")))?;
                if bytes.len() as u64 > max_upload_bytes {
                    return Err(ApiError::Validation(format!(
                        "upload exceeds maximum size of {max_upload_bytes} bytes"
                    )));
                }
                file_bytes = Some(bytes.to_vec());
            }
            "questions" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("invalid questions field: {e}")))?;
                if !text.trim().is_empty() {
                    questions = serde_json::from_str(&text)
                        .map_err(|e| ApiError::Validation(format!("questions must be a JSON array of strings: {e}")))?;
                }
            }
            _ => {}
        }
    }

    let Some(bytes) = file_bytes else {
        return Err(ApiError::Validation("a `pdf` file part is required".to_string()));
    };
    if !has_accepted_extension(&filename) {
        return Err(ApiError::Validation(format!(
            "unsupported file type for {filename}; accepted: {}",
            ACCEPTED_EXTENSIONS.join(", ")
        )));
    }

    log::info!("request_id={request_id} process-pdf filename={filename} bytes={}", bytes.len());

    if questions.is_empty() {
        return Ok(Json(ProcessPdfResponse::Message {
            message: "document accepted; no questions were supplied".to_string(),
        }));
    }

    let answers = state
        .coordinator
        .answer(DocumentsInput::Upload { bytes, filename }, questions)
        .await;

    Ok(Json(ProcessPdfResponse::Answers { answers }))
}
