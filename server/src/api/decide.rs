use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use scrub_core::{DecisionPipeline, DecisionResponse, DecisionSource, Mode, NO_ITEMS_MESSAGE};
use serde_json::Value;

use super::{parse_items, parse_object};
use crate::error::ApiError;
use crate::AppState;

/// Handler for `POST /api/decide`
///
/// The body is parsed by hand; each malformed field gets its own 400 message.
pub async fn decide(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DecisionResponse>, ApiError> {
    let fields = parse_object(&body)?;
    let tokens = parse_items(fields.get("items"))?;
    if tokens.is_empty() {
        return Err(ApiError::BadRequest(NO_ITEMS_MESSAGE.to_string()));
    }
    let mode = parse_mode(fields.get("mode"))?;
    let targets = parse_targets(fields.get("customTargets"))?;

    log::info!(
        "[Server] decide: {} items, mode={}, {} targets",
        tokens.len(),
        mode,
        targets.len()
    );

    let classifier = state.classifier.clone();
    let decision = tokio::task::spawn_blocking(move || {
        DecisionPipeline::new(classifier.as_ref()).run(&tokens, mode, targets.as_slice())
    })
    .await??;

    if let DecisionSource::Fallback(reason) = &decision.source {
        log::debug!("[Server] decision came from fallback: {:?}", reason);
    }
    Ok(Json(decision.response))
}

/// Missing or null selects autodetect.
fn parse_mode(value: Option<&Value>) -> Result<Mode, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(Mode::default()),
        Some(Value::String(s)) => Ok(s.parse()?),
        Some(other) => Err(ApiError::BadRequest(format!("Unsupported mode: {}", other))),
    }
}

/// Accepts a list of strings or a single comma-separated string.
fn parse_targets(value: Option<&Value>) -> Result<Vec<String>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s.split(',').map(str::to_string).collect()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ApiError::BadRequest(format!(
                    "customTargets must contain strings, got {}",
                    other
                ))),
            })
            .collect(),
        Some(_) => Err(ApiError::BadRequest(
            "customTargets must be a list of strings".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use axum::http::StatusCode;
    use scrub_core::{ClassifierError, FALLBACK_NOTE};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn items() -> Value {
        json!([
            {"text": "Hello", "conf": 95, "bbox": [0, 0, 10, 10]},
            {"text": "jane.doe@example.com", "conf": 90, "bbox": [20, 0, 60, 10]},
            {"text": "TopSecretFile", "conf": 88, "bbox": [70, 0, 90, 10]}
        ])
    }

    #[tokio::test]
    async fn test_classifier_answer_is_returned() {
        let classifier = Arc::new(FakeClassifier::replying(Ok(
            "Sure! {\"redact_indices\": [1, 1, 7]}",
        )));
        let app = app(classifier.clone(), default_ocr());

        let (status, body) = send_json(app, "POST", "/api/decide", json!({ "items": items() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "redact_indices": [1, 7] }));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_classifier_falls_back() {
        let classifier = Arc::new(FakeClassifier::replying(Err(ClassifierError::Unavailable(
            "timed out".into(),
        ))));
        let app = app(classifier, default_ocr());

        let (status, body) = send_json(
            app,
            "POST",
            "/api/decide",
            json!({ "items": items(), "mode": "custom", "customTargets": "secret, " }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redact_indices"], json!([1, 2]));
        assert_eq!(body["note"], FALLBACK_NOTE);
    }

    #[tokio::test]
    async fn test_unparsable_output_falls_back() {
        let app = app(Arc::new(FakeClassifier::replying(Ok("I cannot help"))), default_ocr());
        let (status, body) = send_json(app, "POST", "/api/decide", json!({ "items": items() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redact_indices"], json!([1]));
        assert_eq!(body["note"], FALLBACK_NOTE);
    }

    #[tokio::test]
    async fn test_empty_items_rejected_without_call() {
        let classifier = Arc::new(FakeClassifier::replying(Ok("{\"redact_indices\":[]}")));

        let bodies = [
            json!({ "items": [] }),
            json!({ "items": "nope" }),
            json!({}),
            json!({ "items": [], "mode": "bogus" }),
            json!({ "items": [], "customTargets": 5 }),
        ];
        for body in bodies {
            let (status, response) = send_json(app(classifier.clone(), default_ocr()), "POST", "/api/decide", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response, json!({ "error": "No OCR items provided" }));
        }
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_key_is_server_error() {
        let app = app(Arc::new(FakeClassifier::unconfigured()), default_ocr());
        let (status, body) = send_json(app, "POST", "/api/decide", json!({ "items": items() })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Server missing GEMINI_API_KEY env var" }));
    }

    #[tokio::test]
    async fn test_unexpected_error_has_detail() {
        let classifier = Arc::new(FakeClassifier::replying(Err(ClassifierError::Unexpected(
            "bad request builder".into(),
        ))));
        let (status, body) = send_json(app(classifier, default_ocr()), "POST", "/api/decide", json!({ "items": items() })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Gemini call failed");
        assert_eq!(body["detail"], "bad request builder");
    }

    #[tokio::test]
    async fn test_unknown_mode_rejected() {
        let app = app(Arc::new(FakeClassifier::replying(Ok("{}"))), default_ocr());
        let (status, body) = send_json(
            app,
            "POST",
            "/api/decide",
            json!({ "items": items(), "mode": "paranoid" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unsupported mode: paranoid");
    }

    #[test]
    fn test_parse_targets() {
        assert!(parse_targets(None).unwrap().is_empty());
        assert_eq!(parse_targets(Some(&json!("a,b"))).unwrap(), vec!["a", "b"]);
        assert_eq!(parse_targets(Some(&json!(["x", " y "]))).unwrap(), vec!["x", " y "]);
        assert!(parse_targets(Some(&json!([1]))).is_err());
        assert!(parse_targets(Some(&json!(3))).is_err());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode(None).unwrap(), Mode::Autodetect);
        assert_eq!(parse_mode(Some(&json!("CUSTOM"))).unwrap(), Mode::Custom);
        assert!(parse_mode(Some(&json!(1))).is_err());
    }
}
