//! Gemini classifier adapter
//!
//! Sends the rendered decision prompt to the Gemini `generateContent` REST
//! endpoint and hands back the generated text. One attempt per request with a
//! bounded timeout; transport failures and non-success statuses map to
//! [`ClassifierError::Unavailable`] so the pipeline can fall back locally.

mod envelope;

pub use envelope::unwrap_envelope;

use reqwest::blocking::Client;
use scrub_core::{render_prompt, Classifier, ClassifierError, DecisionRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 256;

/// Adapter settings. Passed in explicitly; nothing is read from the
/// environment here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeminiConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl GeminiConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// `{endpoint}/models/{model}:generateContent`
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

pub struct GeminiClassifier {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClassifier {
    pub fn new(config: GeminiConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClassifierError::Unexpected(format!("failed to build HTTP client: {}", e)))?;

        log::info!(
            "[Gemini] classifier ready: model={}, timeout={}s",
            config.model,
            config.timeout().as_secs()
        );
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// JSON body for a `generateContent` call.
    pub fn request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0,
                "maxOutputTokens": self.config.max_output_tokens,
            }
        })
    }

    fn api_key(&self) -> Result<&str, ClassifierError> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ClassifierError::MissingCredential(API_KEY_VAR.to_string()))
    }
}

impl Classifier for GeminiClassifier {
    fn name(&self) -> &str {
        "gemini"
    }

    fn ensure_configured(&self) -> Result<(), ClassifierError> {
        self.api_key().map(|_| ())
    }

    fn classify(&self, request: &DecisionRequest) -> Result<String, ClassifierError> {
        let api_key = self.api_key()?;
        let prompt = render_prompt(request);
        let start = Instant::now();

        log::info!(
            "[Gemini] requesting {} ({} items, mode={})",
            self.config.model,
            request.len(),
            request.mode
        );

        let response = self
            .client
            .post(self.config.generate_url())
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(&prompt))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;

        if !status.is_success() {
            log::warn!("[Gemini] HTTP {} after {} ms", status, start.elapsed().as_millis());
            return Err(ClassifierError::Unavailable(format!(
                "HTTP {}: {}",
                status,
                preview(&body, 200)
            )));
        }

        log::info!("[Gemini] responded in {} ms", start.elapsed().as_millis());
        Ok(unwrap_envelope(&body))
    }
}

/// Request construction problems are bugs or bad configuration; everything
/// else on the wire counts as unavailability.
fn transport_error(err: reqwest::Error) -> ClassifierError {
    if err.is_builder() {
        ClassifierError::Unexpected(err.to_string())
    } else if err.is_timeout() {
        ClassifierError::Unavailable(format!("timed out: {}", err))
    } else {
        ClassifierError::Unavailable(err.to_string())
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}
