use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::AppState;

/// Handler for `POST /api/ocr`; the body is the raw image file.
pub async fn ocr(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty image body".to_string()));
    }

    log::info!("[Server] ocr: {} bytes", body.len());

    let engine = state.ocr.clone();
    let tokens = tokio::task::spawn_blocking(move || engine.recognize_bytes(&body)).await??;

    Ok(Json(json!({ "items": tokens })))
}
