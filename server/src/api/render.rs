use axum::body::Bytes;
use axum::http::header;
use axum::response::IntoResponse;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scrub_render::{decode_image, encode_png, redact_image, RedactStyle};
use serde::Deserialize;
use serde_json::Value;

use super::{parse_items, parse_object};
use crate::error::ApiError;

/// Handler for `POST /api/render`; responds with the redacted PNG.
pub async fn render(body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let fields = parse_object(&body)?;

    let image_b64 = match fields.get("image") {
        Some(Value::String(s)) => s.as_str(),
        _ => return Err(ApiError::BadRequest("Missing base64 image".to_string())),
    };
    let image_bytes = decode_base64_image(image_b64)?;
    let tokens = parse_items(fields.get("items"))?;
    let indices = parse_indices(fields.get("redact_indices"))?;
    let style = match fields.get("style") {
        None | Some(Value::Null) => RedactStyle::default(),
        Some(value) => RedactStyle::deserialize(value)
            .map_err(|e| ApiError::BadRequest(format!("Invalid style: {}", e)))?,
    };

    log::info!(
        "[Server] render: {} bytes, {} items, {} indices",
        image_bytes.len(),
        tokens.len(),
        indices.len()
    );

    let png = tokio::task::spawn_blocking(move || {
        let img = decode_image(&image_bytes)?;
        let redacted = redact_image(&img, &tokens, &indices, &style)?;
        encode_png(&redacted)
    })
    .await??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// Accepts plain base64 or a `data:image/...;base64,` URL.
fn decode_base64_image(input: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match input.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(""),
        None => input,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    match STANDARD.decode(cleaned) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) => Err(ApiError::BadRequest("Missing base64 image".to_string())),
        Err(e) => Err(ApiError::BadRequest(format!("Invalid base64 image: {}", e))),
    }
}

/// Integers only; range checking happens in the renderer.
fn parse_indices(value: Option<&Value>) -> Result<Vec<i64>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_i64()
                    .ok_or_else(|| ApiError::BadRequest(format!("redact_indices must be integers, got {}", v)))
            })
            .collect(),
        Some(_) => Err(ApiError::BadRequest("redact_indices must be a list".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use axum::http::StatusCode;
    use image::{Rgba, RgbaImage};
    use serde_json::json;
    use std::sync::Arc;

    fn white_png_b64() -> String {
        let img = RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 255]));
        STANDARD.encode(encode_png(&img).unwrap())
    }

    async fn post(body: Value) -> (StatusCode, Vec<u8>) {
        let request = axum::http::Request::post("/api/render")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();
        send(app(Arc::new(FakeClassifier::unconfigured()), default_ocr()), request).await
    }

    #[tokio::test]
    async fn test_render_fills_selected_token() {
        let (status, body) = post(json!({
            "image": white_png_b64(),
            "items": [
                {"text": "Hello", "bbox": [0, 0, 10, 10]},
                {"text": "secret", "bbox": [20, 0, 30, 10]}
            ],
            "redact_indices": [1, 5, -2],
            "style": {"padding": 0}
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        let out = decode_image(&body).unwrap().to_rgba8();
        assert_eq!(out.dimensions(), (40, 20));
        assert_eq!(*out.get_pixel(25, 5), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(5, 5), Rgba([255, 255, 255, 255]));
    }

    #[tokio::test]
    async fn test_render_accepts_data_url() {
        let (status, _) = post(json!({
            "image": format!("data:image/png;base64,{}", white_png_b64()),
            "items": [],
            "redact_indices": []
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_render_rejects_bad_input() {
        let cases = [
            json!({ "items": [] }),
            json!({ "image": "%%%not base64%%%" }),
            json!({ "image": STANDARD.encode(b"not an image") }),
            json!({ "image": white_png_b64(), "redact_indices": ["one"] }),
            json!({ "image": white_png_b64(), "style": {"mode": "pixelate"} }),
            json!({ "image": white_png_b64(), "style": {"color": "blue"} }),
        ];
        for case in cases {
            let (status, _) = post(case.clone()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "case {}", case);
        }
    }

    #[test]
    fn test_parse_indices() {
        assert_eq!(parse_indices(Some(&json!([0, 2, -1]))).unwrap(), vec![0, 2, -1]);
        assert!(parse_indices(None).unwrap().is_empty());
        assert!(parse_indices(Some(&json!([1.5]))).is_err());
        assert!(parse_indices(Some(&json!({"a": 1}))).is_err());
    }
}
