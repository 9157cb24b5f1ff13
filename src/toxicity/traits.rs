// Toxicity provider trait: the swap-ready abstraction.
//
// Every classification backend (OpenAI moderation, Perspective, the offline
// keyword mock) sits behind ToxicityProvider and returns the same
// ToxicityOutcome, so the decision service never knows which one it is
// talking to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FilterError, Result};
use crate::language::LanguageTag;

/// The normalized result of scoring one piece of text.
///
/// Built once by a provider (or rebuilt from the cache) and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToxicityOutcome {
    /// Overall score, nominally 0.0 (benign) to 1.0 (very toxic).
    /// Providers don't clamp, so consumers must cope with values outside that range.
    #[serde(rename = "toxicity_score")]
    pub score: f64,
    /// Provider-specific labels, e.g. "hate" or "profanity"
    pub categories: Vec<String>,
    /// Name of the provider that produced the score
    pub provider: String,
    pub explanation: Option<String>,
    /// Raw provider detail: per-category scores, flags, detected language
    pub metadata: Map<String, Value>,
}

impl ToxicityOutcome {
    pub fn new(score: f64, categories: Vec<String>, provider: &str) -> Self {
        Self {
            score,
            categories,
            provider: provider.to_string(),
            explanation: None,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn is_toxic(&self, threshold: f64) -> bool {
        self.score >= threshold
    }

    pub fn should_block(&self, threshold: f64) -> bool {
        self.score >= threshold
    }

    pub fn should_flag(&self, threshold: f64) -> bool {
        self.score >= threshold
    }

    pub fn should_warn(&self, threshold: f64) -> bool {
        self.score >= threshold
    }

    /// The language recorded by the provider, if any.
    pub fn language(&self) -> Option<&str> {
        self.metadata.get("language").and_then(Value::as_str)
    }

    /// `{toxicity_score, categories, provider, explanation, metadata}`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Per-call hints passed from the service to a provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzeOptions {
    /// Detected language, injected by the decision service
    pub language: Option<LanguageTag>,
    /// Arabic text with letter variants folded and diacritics removed
    pub normalized_content: Option<String>,
    /// Caller-supplied options, folded into the cache fingerprint
    pub extra: Map<String, Value>,
}

impl AnalyzeOptions {
    /// Metadata every provider starts from: the detected language, when known.
    pub fn base_metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        if let Some(language) = self.language {
            metadata.insert("language".to_string(), Value::from(language.as_str()));
        }
        metadata
    }
}

/// Trait for scoring text toxicity. Implementations are async because
/// every real provider is an HTTP API call.
#[async_trait]
pub trait ToxicityProvider: Send + Sync {
    /// Score a single text. Implementations call [`check_content_length`] first.
    async fn analyze(&self, text: &str, options: &AnalyzeOptions) -> Result<ToxicityOutcome>;

    fn name(&self) -> &str;

    /// Whether the static config is usable (credentials and endpoint present).
    fn is_configured(&self) -> bool;

    /// Longest input, in bytes, the backend accepts. `None` means unlimited.
    fn max_content_length(&self) -> Option<usize>;
}

/// Reject oversized input before any network work happens.
pub fn check_content_length(provider: &dyn ToxicityProvider, text: &str) -> Result<()> {
    if let Some(max) = provider.max_content_length() {
        if text.len() > max {
            return Err(FilterError::ContentTooLong {
                max,
                actual: text.len(),
            });
        }
    }
    Ok(())
}
