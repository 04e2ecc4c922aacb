//! Bearer-token auth middleware, generalizing the teacher's length-only
//! check into a real comparison against the configured API key.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct AuthError {
    pub error: String,
    pub message: String,
}

fn unauthorized(error: &str, message: &str) -> (StatusCode, Json<AuthError>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthError {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
}

/// Rejects the request unless it carries `Authorization: Bearer <key>`
/// matching `server.api_key`. When no key is configured, auth is a no-op
/// (local development).
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<AuthError>)> {
    let Some(expected) = &state.config.server.api_key else {
        return Ok(next.run(request).await);
    };

    let header = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| unauthorized("missing_authorization", "Authorization: Bearer <token> is required"))?;

    if header.0.token() != expected {
        log::warn!("rejected request with invalid bearer token");
        return Err(unauthorized("invalid_token", "the supplied token is not valid"));
    }

    Ok(next.run(request).await)
}
