// Google Perspective API implementation.
//
// Perspective returns a summary score per requested attribute (TOXICITY,
// INSULT, THREAT, ...). The overall score is the highest attribute score;
// attributes scoring above 0.5 are reported as categories, lower-cased with
// underscores turned into spaces ("SEVERE_TOXICITY" -> "severe toxicity").
//
// The free tier is rate-limited to ~1 QPS, so the provider can optionally
// pace its own requests.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{check_content_length, AnalyzeOptions, ToxicityOutcome, ToxicityProvider};
use crate::config::{ProviderConfig, PERSPECTIVE_ATTRIBUTES};
use crate::error::{FilterError, Result};

/// Perspective rejects comments longer than this.
pub const PERSPECTIVE_MAX_CONTENT_LENGTH: usize = 3_000;

/// Attribute scores above this count as a detected category.
const CATEGORY_THRESHOLD: f64 = 0.5;

pub struct PerspectiveProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    attributes: Vec<String>,
    max_content_length: usize,
    rate_limiter: Option<RateLimiter>,
}

impl PerspectiveProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()
            .map_err(|e| FilterError::provider_api("perspective", e.to_string()))?;

        let attributes = if config.attributes.is_empty() {
            PERSPECTIVE_ATTRIBUTES.iter().map(|a| a.to_string()).collect()
        } else {
            config.attributes.clone()
        };

        let rate_limiter = match config.requests_per_second {
            None => None,
            Some(rps) if rps.is_finite() && rps > 0.0 => Some(RateLimiter::new(rps)),
            Some(rps) => {
                return Err(FilterError::Config(format!(
                    "perspective requests_per_second must be a positive number, got {rps}"
                )))
            }
        };

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            attributes,
            max_content_length: config
                .max_content_length
                .unwrap_or(PERSPECTIVE_MAX_CONTENT_LENGTH),
            rate_limiter,
        })
    }

    fn api_error(message: impl Into<String>) -> FilterError {
        FilterError::provider_api("Perspective API", message)
    }
}

#[async_trait]
impl ToxicityProvider for PerspectiveProvider {
    async fn analyze(&self, text: &str, options: &AnalyzeOptions) -> Result<ToxicityOutcome> {
        check_content_length(self, text)?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let request = PerspectiveRequest {
            comment: Comment { text },
            requested_attributes: self
                .attributes
                .iter()
                .map(|attr| (attr.clone(), AttributeConfig {}))
                .collect(),
            languages: vec!["en"],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::api_error(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::api_error(format!("{status}: {body}")));
        }

        let body: PerspectiveResponse = response
            .json()
            .await
            .map_err(|e| Self::api_error(format!("failed to parse response: {e}")))?;

        let outcome = parse_response(body, options);

        debug!(
            score = outcome.score,
            categories = ?outcome.categories,
            "Perspective scored text"
        );

        Ok(outcome)
    }

    fn name(&self) -> &str {
        "perspective"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.endpoint.is_empty()
    }

    fn max_content_length(&self) -> Option<usize> {
        Some(self.max_content_length)
    }
}

/// "SEVERE_TOXICITY" -> "severe toxicity"
fn category_label(attribute: &str) -> String {
    attribute.replace('_', " ").to_lowercase()
}

fn parse_response(body: PerspectiveResponse, options: &AnalyzeOptions) -> ToxicityOutcome {
    // A missing summary score counts as zero
    let scores: BTreeMap<String, f64> = body
        .attribute_scores
        .iter()
        .map(|(attr, raw)| {
            let value = raw
                .pointer("/summaryScore/value")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            (attr.clone(), value)
        })
        .collect();

    let score = scores.values().copied().fold(0.0_f64, f64::max);
    let categories = scores
        .iter()
        .filter(|(_, value)| **value > CATEGORY_THRESHOLD)
        .map(|(attr, _)| category_label(attr))
        .collect();

    let mut metadata = options.base_metadata();
    metadata.insert(
        "attribute_scores".to_string(),
        Value::Object(
            scores
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(*v)))
                .collect::<Map<String, Value>>(),
        ),
    );
    metadata.insert(
        "detailed_scores".to_string(),
        Value::Object(body.attribute_scores),
    );
    let languages = if body.languages.is_empty() {
        vec!["en".to_string()]
    } else {
        body.languages
    };
    metadata.insert("languages".to_string(), Value::from(languages));

    ToxicityOutcome::new(score, categories, "perspective").with_metadata(metadata)
}

// --- Perspective API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRequest<'a> {
    comment: Comment<'a>,
    requested_attributes: BTreeMap<String, AttributeConfig>,
    languages: Vec<&'a str>,
}

#[derive(Serialize)]
struct Comment<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveResponse {
    /// Kept raw so span scores survive into the outcome metadata
    #[serde(default)]
    attribute_scores: Map<String, Value>,
    #[serde(default)]
    languages: Vec<String>,
}
