//! Decision request construction
//!
//! Projects the token list onto the minimal `{index, text}` shape that is sent
//! to the classifier. Bounding boxes and confidences never leave this crate.

use crate::error::{DecisionError, Result};
use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NO_ITEMS_MESSAGE: &str = "No OCR items provided";

/// How sensitivity is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Generic PII detection.
    #[default]
    Autodetect,
    /// Caller-supplied substring targets.
    Custom,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Autodetect => "autodetect",
            Mode::Custom => "custom",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autodetect" => Ok(Mode::Autodetect),
            "custom" => Ok(Mode::Custom),
            other => Err(DecisionError::Validation(format!(
                "Unsupported mode: {}",
                other
            ))),
        }
    }
}

/// The text-only view of a token that the classifier reasons over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionItem {
    pub index: usize,
    pub text: String,
}

/// Normalized classifier request, built fresh for every redaction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub mode: Mode,
    pub custom_targets: Vec<String>,
    pub items: Vec<DecisionItem>,
}

impl DecisionRequest {
    /// Builds a request from OCR tokens.
    ///
    /// Fails with [`DecisionError::Validation`] when `tokens` is empty.
    pub fn build<S: AsRef<str>>(tokens: &[Token], mode: Mode, custom_targets: &[S]) -> Result<Self> {
        if tokens.is_empty() {
            return Err(DecisionError::Validation(NO_ITEMS_MESSAGE.to_string()));
        }

        let items = tokens
            .iter()
            .enumerate()
            .map(|(index, token)| DecisionItem {
                index,
                text: token.text.clone(),
            })
            .collect();

        Ok(Self {
            mode,
            custom_targets: normalize_targets(custom_targets),
            items,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Trims every target and drops the ones left empty. Order is kept and
/// duplicates are allowed.
pub fn normalize_targets<S: AsRef<str>>(targets: &[S]) -> Vec<String> {
    targets
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
