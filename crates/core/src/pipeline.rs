//! Decision pipeline
//!
//! Runs one redaction decision through `Built -> Requested -> {ParsedOk,
//! ParseFailed} -> Finalized`. Classifier unavailability and unparsable
//! output both end in the local fallback, so once the pipeline has started it
//! always produces a [`DecisionResponse`].

use crate::error::{ClassifierError, Result};
use crate::heuristics::{fallback_hits, HitReason};
use crate::request::{DecisionRequest, Mode};
use crate::response::{parse, DecisionResponse, ParseFailure};
use crate::token::Token;
use std::collections::BTreeMap;
use std::sync::Arc;

/// External classifier seam.
///
/// Implementations send the request to some text-generation service and
/// return its raw textual answer.
pub trait Classifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Checks credentials before any request is attempted.
    fn ensure_configured(&self) -> std::result::Result<(), ClassifierError> {
        Ok(())
    }

    fn classify(&self, request: &DecisionRequest) -> std::result::Result<String, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn ensure_configured(&self) -> std::result::Result<(), ClassifierError> {
        (**self).ensure_configured()
    }

    fn classify(&self, request: &DecisionRequest) -> std::result::Result<String, ClassifierError> {
        (**self).classify(request)
    }
}

/// Pipeline states, recorded in order in [`Decision::trace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Built,
    Requested,
    ParsedOk,
    ParseFailed,
    Finalized,
}

/// Why the fallback ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    Unavailable(String),
    Unparsable(ParseFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionSource {
    Classifier,
    Fallback(FallbackReason),
}

/// Final output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub response: DecisionResponse,
    pub source: DecisionSource,
    pub trace: Vec<Stage>,
}

pub struct DecisionPipeline<'a, C: ?Sized> {
    classifier: &'a C,
}

impl<'a, C: Classifier + ?Sized> DecisionPipeline<'a, C> {
    pub fn new(classifier: &'a C) -> Self {
        Self { classifier }
    }

    /// Decides which tokens to redact.
    ///
    /// Errors only for empty input, missing credentials, or an unexpected
    /// classifier failure.
    pub fn run<S: AsRef<str>>(
        &self,
        tokens: &[Token],
        mode: Mode,
        custom_targets: &[S],
    ) -> Result<Decision> {
        let request = DecisionRequest::build(tokens, mode, custom_targets)?;
        self.classifier.ensure_configured()?;

        let mut trace = vec![Stage::Built];
        log::debug!(
            "[Pipeline] request built: mode={}, items={}, targets={}",
            request.mode,
            request.len(),
            request.custom_targets.len()
        );

        trace.push(Stage::Requested);
        let outcome = match self.classifier.classify(&request) {
            Ok(raw) => {
                log::trace!("[Pipeline] {} raw output: {:?}", self.classifier.name(), raw);
                parse(&raw).map_err(FallbackReason::Unparsable)
            }
            Err(ClassifierError::Unavailable(detail)) => Err(FallbackReason::Unavailable(detail)),
            Err(err) => {
                log::error!("[Pipeline] {} failed: {}", self.classifier.name(), err);
                return Err(err.into());
            }
        };

        let (response, source) = match outcome {
            Ok(response) => {
                trace.push(Stage::ParsedOk);
                let stray = response.out_of_range(request.len());
                if stray > 0 {
                    log::warn!(
                        "[Pipeline] {} returned {} index(es) outside 0..{}",
                        self.classifier.name(),
                        stray,
                        request.len()
                    );
                }
                (response, DecisionSource::Classifier)
            }
            Err(reason) => {
                trace.push(Stage::ParseFailed);
                match &reason {
                    FallbackReason::Unavailable(detail) => log::warn!(
                        "[Pipeline] {} unavailable, using fallback heuristics: {}",
                        self.classifier.name(),
                        detail
                    ),
                    FallbackReason::Unparsable(failure) => log::warn!(
                        "[Pipeline] {} output unusable, using fallback heuristics: {}",
                        self.classifier.name(),
                        failure
                    ),
                }
                (
                    run_fallback(tokens, request.mode, &request.custom_targets),
                    DecisionSource::Fallback(reason),
                )
            }
        };

        trace.push(Stage::Finalized);
        log::info!(
            "[Pipeline] finalized: {} of {} items selected ({})",
            response.redact_indices.len(),
            request.len(),
            if response.is_fallback() { "fallback" } else { self.classifier.name() }
        );

        Ok(Decision {
            response,
            source,
            trace,
        })
    }
}

fn run_fallback(tokens: &[Token], mode: Mode, custom_targets: &[String]) -> DecisionResponse {
    let hits = fallback_hits(tokens, mode, custom_targets);

    let mut by_reason: BTreeMap<&str, usize> = BTreeMap::new();
    for hit in &hits {
        let key = match &hit.reason {
            HitReason::Pattern(kind) => kind.as_str(),
            HitReason::CustomTarget(_) => "custom_target",
        };
        *by_reason.entry(key).or_default() += 1;
    }
    log::debug!("[Pipeline] fallback hits by reason: {:?}", by_reason);

    DecisionResponse::from_hits(&hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecisionError;
    use crate::heuristics::fallback_classify;
    use crate::response::FALLBACK_NOTE;
    use crate::token::BBox;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeClassifier {
        reply: std::result::Result<String, ClassifierError>,
        configured: bool,
        calls: AtomicUsize,
    }

    impl FakeClassifier {
        fn replying(reply: std::result::Result<&str, ClassifierError>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                configured: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Classifier for FakeClassifier {
        fn name(&self) -> &str {
            "fake"
        }

        fn ensure_configured(&self) -> std::result::Result<(), ClassifierError> {
            if self.configured {
                Ok(())
            } else {
                Err(ClassifierError::MissingCredential("FAKE_API_KEY".to_string()))
            }
        }

        fn classify(&self, _request: &DecisionRequest) -> std::result::Result<String, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn tokens(texts: &[&str]) -> Vec<Token> {
        texts
            .iter()
            .map(|t| Token::new(*t, 90.0, BBox::new(0.0, 0.0, 10.0, 10.0)))
            .collect()
    }

    #[test]
    fn test_parsed_classifier_output_is_used() {
        let classifier = FakeClassifier::replying(Ok("```json\n{\"redact_indices\": [1]}\n```"));
        let decision = DecisionPipeline::new(&classifier)
            .run::<&str>(&tokens(&["Name", "Jane Doe"]), Mode::Autodetect, &[])
            .unwrap();

        assert_eq!(decision.response, DecisionResponse::new([1]));
        assert_eq!(decision.source, DecisionSource::Classifier);
        assert_eq!(
            decision.trace,
            vec![Stage::Built, Stage::Requested, Stage::ParsedOk, Stage::Finalized]
        );
    }

    #[test]
    fn test_unavailable_falls_back_with_note() {
        let classifier =
            FakeClassifier::replying(Err(ClassifierError::Unavailable("timed out".to_string())));
        let decision = DecisionPipeline::new(&classifier)
            .run::<&str>(&tokens(&["Hello", "jane.doe@example.com"]), Mode::Autodetect, &[])
            .unwrap();

        assert_eq!(decision.response.note.as_deref(), Some(FALLBACK_NOTE));
        assert_eq!(decision.response.redact_indices, vec![1]);
        assert_eq!(
            decision.source,
            DecisionSource::Fallback(FallbackReason::Unavailable("timed out".to_string()))
        );
        assert_eq!(
            decision.trace,
            vec![Stage::Built, Stage::Requested, Stage::ParseFailed, Stage::Finalized]
        );
    }

    #[test]
    fn test_unparsable_output_falls_back() {
        let classifier = FakeClassifier::replying(Ok("I'd rather not say."));
        let decision = DecisionPipeline::new(&classifier)
            .run(&tokens(&["TopSecretFile", "Hello"]), Mode::Custom, &["secret"])
            .unwrap();

        assert!(decision.response.is_fallback());
        assert_eq!(decision.response.redact_indices, vec![0]);
        assert_eq!(
            decision.source,
            DecisionSource::Fallback(FallbackReason::Unparsable(ParseFailure::NoJson))
        );
    }

    #[test]
    fn test_fallback_matches_fallback_classify() {
        let input = tokens(&["4111 1111 1111 1111", "Hello", "TopSecretFile", "a@b.io"]);
        let classifier =
            FakeClassifier::replying(Err(ClassifierError::Unavailable("down".to_string())));

        for (mode, targets) in [(Mode::Custom, vec!["secret"]), (Mode::Autodetect, vec!["secret"])] {
            let decision = DecisionPipeline::new(&classifier)
                .run(&input, mode, targets.as_slice())
                .unwrap();
            assert_eq!(decision.response, fallback_classify(&input, mode, targets.as_slice()));
        }
    }

    #[test]
    fn test_empty_input_rejected_before_classifier() {
        let classifier = FakeClassifier::replying(Ok("{\"redact_indices\": []}"));
        let err = DecisionPipeline::new(&classifier)
            .run::<&str>(&[], Mode::Autodetect, &[])
            .unwrap_err();

        assert_eq!(err, DecisionError::Validation("No OCR items provided".to_string()));
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn test_missing_credentials_surfaced() {
        let mut classifier = FakeClassifier::replying(Ok("{\"redact_indices\": []}"));
        classifier.configured = false;
        let err = DecisionPipeline::new(&classifier)
            .run::<&str>(&tokens(&["Hello"]), Mode::Autodetect, &[])
            .unwrap_err();

        assert_eq!(
            err,
            DecisionError::Configuration("Server missing FAKE_API_KEY env var".to_string())
        );
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn test_unexpected_error_surfaced() {
        let classifier =
            FakeClassifier::replying(Err(ClassifierError::Unexpected("bad url".to_string())));
        let err = DecisionPipeline::new(&classifier)
            .run::<&str>(&tokens(&["Hello"]), Mode::Autodetect, &[])
            .unwrap_err();

        assert_eq!(err, DecisionError::Adapter("bad url".to_string()));
    }

    #[test]
    fn test_out_of_range_indices_pass_through() {
        let classifier = FakeClassifier::replying(Ok("{\"redact_indices\": [0, 42]}"));
        let decision = DecisionPipeline::new(&classifier)
            .run::<&str>(&tokens(&["a", "b"]), Mode::Autodetect, &[])
            .unwrap();

        assert_eq!(decision.response.redact_indices, vec![0, 42]);
        assert_eq!(decision.response.indices_within(2), vec![0]);
    }

    #[test]
    fn test_works_through_shared_trait_object() {
        let classifier: Arc<dyn Classifier> =
            Arc::new(FakeClassifier::replying(Ok("{\"redact_indices\": [0]}")));
        let decision = DecisionPipeline::new(classifier.as_ref())
            .run::<&str>(&tokens(&["a"]), Mode::Autodetect, &[])
            .unwrap();
        assert_eq!(decision.source, DecisionSource::Classifier);
    }
}
