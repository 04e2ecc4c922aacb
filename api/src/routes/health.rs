use axum::Json;

use crate::dto::HealthResponse;

/// Ambient ops surface (SPEC_FULL.md §5) — mirrors the `GET /health`
/// contract the extractor sidecars themselves expose.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
