//! HTTP handlers

pub mod decide;
pub mod ocr;
pub mod render;

use axum::extract::State;
use axum::Json;
use scrub_core::{Token, NO_ITEMS_MESSAGE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::AppState;

/// Handler for `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let classifier_ready = state.classifier.ensure_configured().is_ok();
    let ocr = state.ocr.clone();
    // probing tesseract spawns a process
    let ocr_status = tokio::task::spawn_blocking(move || ocr.status()).await?;

    Ok(Json(json!({
        "status": "ok",
        "classifier": classifier_ready,
        "ocr": ocr_status,
    })))
}

/// Parses a request body as a JSON object.
pub(crate) fn parse_object(body: &[u8]) -> Result<serde_json::Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::BadRequest("Request body must be a JSON object".to_string())),
        Err(e) => Err(ApiError::BadRequest(format!("Invalid JSON body: {}", e))),
    }
}

/// Reads the `items` field. A missing field gives an empty list; anything
/// other than a list is rejected.
pub(crate) fn parse_items(value: Option<&Value>) -> Result<Vec<Token>, ApiError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ApiError::BadRequest(NO_ITEMS_MESSAGE.to_string())),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            Token::deserialize(item)
                .map_err(|e| ApiError::BadRequest(format!("Invalid OCR item at position {}: {}", i, e)))
        })
        .collect()
}
