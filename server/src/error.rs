//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scrub_core::DecisionError;
use scrub_ocr::OcrError;
use scrub_render::RenderError;
use serde_json::json;

pub const CLASSIFIER_FAILED: &str = "Gemini call failed";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Configuration(String),
    #[error("Gemini call failed: {0}")]
    Classifier(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) | ApiError::Classifier(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest(message)
            | ApiError::Configuration(message)
            | ApiError::Unavailable(message) => json!({ "error": message }),
            ApiError::Classifier(detail) => json!({ "error": CLASSIFIER_FAILED, "detail": detail }),
            ApiError::Internal(detail) => {
                log::error!("[Server] internal error: {}", detail);
                json!({ "error": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<DecisionError> for ApiError {
    fn from(err: DecisionError) -> Self {
        match err {
            DecisionError::Validation(message) => ApiError::BadRequest(message),
            DecisionError::Configuration(message) => ApiError::Configuration(message),
            DecisionError::Adapter(detail) => ApiError::Classifier(detail),
        }
    }
}

impl From<OcrError> for ApiError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::Image(e) => ApiError::BadRequest(format!("Could not decode image: {}", e)),
            OcrError::EngineUnavailable(message) => ApiError::Unavailable(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Image(e) => ApiError::BadRequest(format!("Could not decode image: {}", e)),
            RenderError::InvalidColor(color) => ApiError::BadRequest(format!("Invalid color: {}", color)),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrub_core::ClassifierError;

    #[test]
    fn test_decision_error_mapping() {
        let err: ApiError = DecisionError::Validation("No OCR items provided".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = DecisionError::from(ClassifierError::MissingCredential("GEMINI_API_KEY".into())).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Server missing GEMINI_API_KEY env var");

        let err: ApiError = DecisionError::Adapter("boom".into()).into();
        assert!(matches!(err, ApiError::Classifier(ref d) if d == "boom"));
    }

    #[test]
    fn test_ocr_error_mapping() {
        let err: ApiError = OcrError::EngineUnavailable("no tesseract".into()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = OcrError::Engine("crashed".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
