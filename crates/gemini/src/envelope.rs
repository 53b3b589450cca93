//! Response envelope decoding
//!
//! Generative APIs have shipped several response shapes over time. The body
//! is run through an ordered list of matchers; the first one that yields text
//! wins, and a body no matcher recognizes is returned verbatim.

use serde_json::Value;

type EnvelopeMatcher = fn(&Value) -> Option<String>;

/// Known envelope shapes, most specific first.
const MATCHERS: &[(&str, EnvelopeMatcher)] = &[
    ("candidates.content.parts", candidate_parts),
    ("candidates.output", candidate_output),
    ("text", top_level_text),
    ("choices.message.content", chat_choice),
];

/// Extracts the generated text from a raw response body.
pub fn unwrap_envelope(body: &str) -> String {
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => {
            log::debug!("[Gemini] response body is not JSON, using it as text");
            return body.to_string();
        }
    };

    for (name, matcher) in MATCHERS {
        if let Some(text) = matcher(&value) {
            log::debug!("[Gemini] response envelope matched: {}", name);
            return text;
        }
    }

    log::debug!("[Gemini] no known response envelope, using body as text");
    body.to_string()
}

fn candidate_parts(value: &Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

fn candidate_output(value: &Value) -> Option<String> {
    value
        .get("candidates")?
        .get(0)?
        .get("output")?
        .as_str()
        .map(str::to_string)
}

fn top_level_text(value: &Value) -> Option<String> {
    value.get("text")?.as_str().map(str::to_string)
}

fn chat_choice(value: &Value) -> Option<String> {
    value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}
