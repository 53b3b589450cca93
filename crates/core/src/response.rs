//! Decision response and classifier output parsing
//!
//! Classifier output is free-form text. [`parse`] first reads it as a whole
//! JSON document and then falls back to the first balanced `{...}` span that
//! is valid JSON, which covers prose or markdown fences around the payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

pub const FALLBACK_NOTE: &str = "fallback heuristics used";

const INDICES_FIELD: &str = "redact_indices";

/// The set of token indices selected for redaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecisionResponse {
    /// Indices in first-seen order without repeats. Not range checked.
    pub redact_indices: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DecisionResponse {
    pub fn new(indices: impl IntoIterator<Item = i64>) -> Self {
        Self {
            redact_indices: dedup_in_order(indices),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.note.as_deref() == Some(FALLBACK_NOTE)
    }

    /// Indices that address one of `len` tokens; everything else is dropped.
    pub fn indices_within(&self, len: usize) -> Vec<usize> {
        self.redact_indices
            .iter()
            .filter_map(|&i| usize::try_from(i).ok())
            .filter(|&i| i < len)
            .collect()
    }

    /// Number of indices outside `0..len`.
    pub fn out_of_range(&self, len: usize) -> usize {
        self.redact_indices.len() - self.indices_within(len).len()
    }
}

/// Why classifier output could not be turned into a [`DecisionResponse`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("no JSON object found in classifier output")]
    NoJson,
    #[error("`redact_indices` field is missing")]
    MissingIndices,
    #[error("`redact_indices` is not an array of integers")]
    InvalidIndices,
}

/// Parses raw classifier output.
pub fn parse(raw: &str) -> Result<DecisionResponse, ParseFailure> {
    let first = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => match decode(&value) {
            Ok(response) => return Ok(response),
            Err(failure) => Some(failure),
        },
        Err(_) => None,
    };

    match first_object_span(raw) {
        Some(value) => decode(&value),
        None => Err(first.unwrap_or(ParseFailure::NoJson)),
    }
}

fn decode(value: &Value) -> Result<DecisionResponse, ParseFailure> {
    let field = value
        .as_object()
        .and_then(|obj| obj.get(INDICES_FIELD))
        .ok_or(ParseFailure::MissingIndices)?;
    let array = field.as_array().ok_or(ParseFailure::InvalidIndices)?;

    let indices = array
        .iter()
        .map(Value::as_i64)
        .collect::<Option<Vec<i64>>>()
        .ok_or(ParseFailure::InvalidIndices)?;

    Ok(DecisionResponse::new(indices))
}

/// Finds the first balanced `{...}` span that parses as JSON.
fn first_object_span(raw: &str) -> Option<Value> {
    let mut search_from = 0;
    while let Some(offset) = raw[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&raw[start..]) {
            if let Ok(value) = serde_json::from_str::<Value>(&raw[start..start + end]) {
                return Some(value);
            }
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced object starting at `text[0] == '{'`.
/// Braces inside JSON strings are ignored.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn dedup_in_order(indices: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    indices.into_iter().filter(|i| seen.insert(*i)).collect()
}
