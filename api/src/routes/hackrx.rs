use std::sync::Arc;

use axum::{extract::State, Json};
use uuid::Uuid;

use rag_system::coordinator::DocumentsInput;

use crate::dto::{AnswersResponse, HackRxRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/v1/hackrx/run` (spec.md §6): 200 even on partial timeout,
/// 400 on validation error. Unexpected panics inside the coordinator are
/// not caught here — they're a 500 via axum's default panic response,
/// consistent with "only validation and download failures are surfaced".
pub async fn run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HackRxRequest>,
) -> Result<Json<AnswersResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    log::info!("request_id={request_id} hackrx/run documents={}", request.documents);

    if request.documents.trim().is_empty() {
        return Err(ApiError::Validation("documents must be a non-empty URL".to_string()));
    }
    if request.questions.is_empty() {
        return Err(ApiError::Validation("questions must be a non-empty array of strings".to_string()));
    }

    let answers = state
        .coordinator
        .answer(DocumentsInput::Url(request.documents), request.questions)
        .await;

    log::info!("request_id={request_id} hackrx/run completed answers={}", answers.len());
    Ok(Json(AnswersResponse { answers }))
}
