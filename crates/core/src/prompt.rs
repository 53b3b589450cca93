//! Classifier prompt templating
//!
//! Pure text rendering; the transport lives in the adapter crates so the
//! prompt can be checked without any network access.

use crate::request::{DecisionRequest, Mode};
use serde_json::Value;

const PREAMBLE: &str = "You are a redaction assistant. You receive words extracted by OCR from an \
image. Each item has an integer index and its text. Decide which items must be redacted.";

const AUTODETECT_POLICY: &str = "Flag items that are sensitive personal information: payment card \
numbers, full names, street addresses, phone numbers, email addresses, government ID, passport, \
account or routing numbers, coordinate triples that look like in-game or geographic coordinates, \
and any other personally identifying information. Do not flag single common words.";

const CUSTOM_POLICY: &str = "Flag items whose text equals or contains any entry of customTargets \
as a substring, ignoring case. A target that names a pattern, such as credit_card, also matches \
numeric groupings that look like card numbers even when the text does not contain the target \
literally.";

const OUTPUT_CONTRACT: &str = "Respond with exactly one JSON object and nothing else, of the form \
{\"redact_indices\": [int, ...]}. Only use indices that appear in items. If nothing needs \
redaction, respond with {\"redact_indices\": []}.";

/// Policy paragraph for a mode.
pub fn policy(mode: Mode) -> &'static str {
    match mode {
        Mode::Autodetect => AUTODETECT_POLICY,
        Mode::Custom => CUSTOM_POLICY,
    }
}

/// Renders the instruction prompt for a request.
pub fn render_prompt(request: &DecisionRequest) -> String {
    format!(
        "{}\n\nMode: {}\n{}\n\n{}\n\nRequest:\n{}",
        PREAMBLE,
        request.mode,
        policy(request.mode),
        OUTPUT_CONTRACT,
        request_payload(request)
    )
}

/// JSON payload embedded in the prompt: the request's own wire form.
pub fn request_payload(request: &DecisionRequest) -> Value {
    // plain strings and integers only, serialization cannot fail
    serde_json::to_value(request).unwrap_or(Value::Null)
}
