// OpenAI moderation endpoint implementation.
//
// The moderation API returns a boolean flag and a numeric score for each
// category (hate, harassment, self-harm, ...). The overall score is the
// highest category score; the categories reported are the flagged ones.
//
// API docs: https://platform.openai.com/docs/api-reference/moderations

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::traits::{check_content_length, AnalyzeOptions, ToxicityOutcome, ToxicityProvider};
use crate::config::{ProviderConfig, OPENAI_MODEL};
use crate::error::{FilterError, Result};

/// Approximate input limit for the moderation endpoint.
pub const OPENAI_MAX_CONTENT_LENGTH: usize = 32_000;

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_content_length: usize,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()
            .map_err(|e| FilterError::provider_api("openai", e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OPENAI_MODEL.to_string()),
            max_content_length: config
                .max_content_length
                .unwrap_or(OPENAI_MAX_CONTENT_LENGTH),
        })
    }

    fn api_error(message: impl Into<String>) -> FilterError {
        FilterError::provider_api("OpenAI", message)
    }
}

#[async_trait]
impl ToxicityProvider for OpenAiProvider {
    async fn analyze(&self, text: &str, options: &AnalyzeOptions) -> Result<ToxicityOutcome> {
        check_content_length(self, text)?;

        let request = ModerationRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::api_error(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::api_error(format!("{status}: {body}")));
        }

        let body: ModerationResponse = response
            .json()
            .await
            .map_err(|e| Self::api_error(format!("failed to parse response: {e}")))?;

        let outcome = parse_response(body, &self.model, options);

        debug!(
            score = outcome.score,
            categories = ?outcome.categories,
            "OpenAI moderation scored text"
        );

        Ok(outcome)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.endpoint.is_empty()
    }

    fn max_content_length(&self) -> Option<usize> {
        Some(self.max_content_length)
    }
}

fn parse_response(body: ModerationResponse, model: &str, options: &AnalyzeOptions) -> ToxicityOutcome {
    let result = body.results.into_iter().next().unwrap_or_default();

    let score = result
        .category_scores
        .values()
        .copied()
        .fold(0.0_f64, f64::max);

    // BTreeMap keeps the category order stable across calls
    let categories: Vec<String> = result
        .category_scores
        .keys()
        .filter(|name| result.categories.get(*name).copied().unwrap_or(false))
        .cloned()
        .collect();

    let mut metadata = options.base_metadata();
    metadata.insert(
        "category_scores".to_string(),
        Value::Object(
            result
                .category_scores
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(*v)))
                .collect::<Map<String, Value>>(),
        ),
    );
    metadata.insert("flagged".to_string(), Value::Bool(result.flagged));
    metadata.insert("model".to_string(), Value::from(model));

    ToxicityOutcome::new(score, categories, "openai").with_metadata(metadata)
}

// --- Moderation API request/response types ---

#[derive(Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResult>,
}

#[derive(Deserialize, Default)]
struct ModerationResult {
    #[serde(default)]
    categories: BTreeMap<String, bool>,
    #[serde(default)]
    category_scores: BTreeMap<String, f64>,
    #[serde(default)]
    flagged: bool,
}
