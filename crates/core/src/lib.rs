//! Redaction decision core.
//!
//! Turns OCR tokens into a set of token indices to redact, asking an external
//! classifier first and falling back to local heuristics when it is
//! unavailable or answers with something unusable.

pub mod error;
pub mod heuristics;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod response;
pub mod token;

pub use error::{ClassifierError, DecisionError, Result};
pub use heuristics::{detect, fallback_classify, fallback_hits, FallbackHit, HitReason, PatternKind};
pub use pipeline::{Classifier, Decision, DecisionPipeline, DecisionSource, FallbackReason, Stage};
pub use prompt::render_prompt;
pub use request::{DecisionItem, DecisionRequest, Mode, NO_ITEMS_MESSAGE};
pub use response::{parse, DecisionResponse, ParseFailure, FALLBACK_NOTE};
pub use token::{BBox, Token};
