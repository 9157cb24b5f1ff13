// Offline keyword scorer.
//
// No network, no credentials. Scores text by counting a small list of
// abusive words, which makes it useful for trying the CLI without API keys
// and for exercising the decision service deterministically in tests.

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{AnalyzeOptions, ToxicityOutcome, ToxicityProvider};
use crate::error::Result;

const BAD_WORDS: [&str; 10] = [
    "stupid", "idiot", "hate", "kill", "die", "moron", "dumb", "fuck", "shit", "damn",
];

const HATE_WORDS: [&str; 2] = ["hate", "kill"];
const PROFANITY_WORDS: [&str; 2] = ["fuck", "shit"];

#[derive(Debug, Default, Clone)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Keyword score: 0.3 per distinct bad word (capped at 0.9) plus a small
/// length factor (capped at 0.1).
pub fn keyword_score(text: &str) -> (f64, Vec<String>) {
    let lowered = text.to_lowercase();
    let hits = BAD_WORDS.iter().filter(|w| lowered.contains(*w)).count();

    let base = (hits as f64 * 0.3).min(0.9);
    let length_factor = (text.len() as f64 / 100.0).min(0.1);
    let score = (base + length_factor).min(1.0);

    let mut categories = Vec::new();
    if HATE_WORDS.iter().any(|w| lowered.contains(w)) {
        categories.push("hate".to_string());
    }
    // Any listed word at all counts as harassment
    if hits > 0 {
        categories.push("harassment".to_string());
    }
    if PROFANITY_WORDS.iter().any(|w| lowered.contains(w)) {
        categories.push("profanity".to_string());
    }

    (score, categories)
}

#[async_trait]
impl ToxicityProvider for MockProvider {
    async fn analyze(&self, text: &str, options: &AnalyzeOptions) -> Result<ToxicityOutcome> {
        let (score, categories) = keyword_score(text);

        let mut metadata = options.base_metadata();
        metadata.insert("mock".to_string(), Value::Bool(true));

        Ok(ToxicityOutcome::new(score, categories, "mock")
            .with_explanation("keyword heuristic, not a real classifier")
            .with_metadata(metadata))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn max_content_length(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_scores_only_length() {
        let (score, categories) = keyword_score("have a nice day");
        // 15 bytes, length factor capped at 0.1
        assert!((score - 0.1).abs() < 1e-9, "got {score}");
        assert!(categories.is_empty());
    }

    #[test]
    fn test_short_text_length_factor_below_cap() {
        let (score, _) = keyword_score("hi");
        assert!((score - 0.02).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_bad_words_accumulate_and_cap() {
        let (score, categories) = keyword_score("you stupid idiot, I hate you, shit");
        // four distinct words: base capped at 0.9, length factor capped at 0.1
        assert!((score - 1.0).abs() < 1e-9, "got {score}");
        assert_eq!(categories, vec!["hate", "harassment", "profanity"]);
    }

    #[test]
    fn test_damn_is_scored_but_not_profanity() {
        let (score, categories) = keyword_score("damn");
        assert!((score - 0.34).abs() < 1e-9, "got {score}");
        assert_eq!(categories, vec!["harassment"]);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let (_, categories) = keyword_score("MORON");
        assert_eq!(categories, vec!["harassment"]);
    }
}
