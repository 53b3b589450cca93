//! Local fallback classifier
//!
//! Deterministic regex detectors used when the external classifier is
//! unreachable or its answer cannot be parsed:
//! - card-like digit runs (13-19 digits, optional space/hyphen separators)
//! - coordinate triples (`x, y, z` with optional signs and decimals)
//! - email addresses
//! - phone numbers
//!
//! In custom mode, case-insensitive substring targets are matched as well.
//! Everything here is a pure function of its inputs.

use crate::request::{normalize_targets, Mode};
use crate::response::{DecisionResponse, FALLBACK_NOTE};
use crate::token::Token;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// ============================================================================
// Patterns
// ============================================================================

const CARD_PATTERNS: &[&str] = &[r"\b\d(?:[ -]?\d){12,18}\b"];

const COORDINATE_PATTERNS: &[&str] = &[
    r"-?\d+(?:\.\d+)?(?:\s*,\s*|\s+)-?\d+(?:\.\d+)?(?:\s*,\s*|\s+)-?\d+(?:\.\d+)?",
];

const EMAIL_PATTERNS: &[&str] = &[r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}"];

const PHONE_PATTERNS: &[&str] = &[
    r"(?:^|[^\d])(?:\+?\d{1,3}[\s.\-]?)?(?:\(\d{2,4}\)[\s.\-]?)?\d{3,4}[\s.\-]?\d{4}(?:[^\d]|$)",
];

struct DetectorPatterns {
    card: Vec<Regex>,
    coordinates: Vec<Regex>,
    email: Vec<Regex>,
    phone: Vec<Regex>,
}

static PATTERNS: Lazy<DetectorPatterns> = Lazy::new(|| DetectorPatterns {
    card: compile_patterns(CARD_PATTERNS),
    coordinates: compile_patterns(COORDINATE_PATTERNS),
    email: compile_patterns(EMAIL_PATTERNS),
    phone: compile_patterns(PHONE_PATTERNS),
});

fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                log::error!("[Heuristics] invalid pattern {:?}: {}", p, e);
                None
            }
        })
        .collect()
}

// ============================================================================
// Detection
// ============================================================================

/// Built-in detector that flagged a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    CreditCard,
    Coordinates,
    Email,
    Phone,
}

impl PatternKind {
    /// Detectors in evaluation order.
    pub const ALL: [PatternKind; 4] = [
        PatternKind::CreditCard,
        PatternKind::Coordinates,
        PatternKind::Email,
        PatternKind::Phone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::CreditCard => "credit_card",
            PatternKind::Coordinates => "coordinates",
            PatternKind::Email => "email",
            PatternKind::Phone => "phone",
        }
    }

    fn patterns(&self) -> &'static [Regex] {
        let patterns = &*PATTERNS;
        match self {
            PatternKind::CreditCard => &patterns.card,
            PatternKind::Coordinates => &patterns.coordinates,
            PatternKind::Email => &patterns.email,
            PatternKind::Phone => &patterns.phone,
        }
    }
}

/// Returns the first built-in detector matching `text`.
pub fn detect(text: &str) -> Option<PatternKind> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    PatternKind::ALL
        .into_iter()
        .find(|kind| kind.patterns().iter().any(|re| re.is_match(text)))
}

/// Why the fallback selected a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HitReason {
    Pattern(PatternKind),
    CustomTarget(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackHit {
    pub index: usize,
    pub reason: HitReason,
}

/// Runs every detector over `tokens`, in token order, one hit per token.
pub fn fallback_hits<S: AsRef<str>>(
    tokens: &[Token],
    mode: Mode,
    custom_targets: &[S],
) -> Vec<FallbackHit> {
    let targets: Vec<String> = match mode {
        Mode::Custom => normalize_targets(custom_targets)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect(),
        Mode::Autodetect => Vec::new(),
    };

    tokens
        .iter()
        .enumerate()
        .filter_map(|(index, token)| {
            let reason = match detect(&token.text) {
                Some(kind) => HitReason::Pattern(kind),
                None => HitReason::CustomTarget(matching_target(&token.text, &targets)?.to_string()),
            };
            Some(FallbackHit { index, reason })
        })
        .collect()
}

impl DecisionResponse {
    /// Fallback response for a set of hits, carrying [`FALLBACK_NOTE`].
    pub fn from_hits(hits: &[FallbackHit]) -> Self {
        DecisionResponse::new(hits.iter().map(|hit| hit.index as i64)).with_note(FALLBACK_NOTE)
    }
}

/// Local classification, always succeeds.
pub fn fallback_classify<S: AsRef<str>>(
    tokens: &[Token],
    mode: Mode,
    custom_targets: &[S],
) -> DecisionResponse {
    DecisionResponse::from_hits(&fallback_hits(tokens, mode, custom_targets))
}

/// First lowercased target contained in `text`, ignoring case.
fn matching_target<'a>(text: &str, lowered_targets: &'a [String]) -> Option<&'a str> {
    if lowered_targets.is_empty() {
        return None;
    }
    let lowered = text.to_lowercase();
    lowered_targets
        .iter()
        .find(|target| lowered.contains(target.as_str()))
        .map(String::as_str)
}

// ============================================================================
// Tests
// ============================================================================
