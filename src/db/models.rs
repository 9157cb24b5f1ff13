// Data models: Rust structs that map to database rows.
//
// Kept apart from the queries so the decision service can build records
// without depending on rusqlite.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::fingerprint;
use crate::language::LanguageTag;
use crate::policy::Action;
use crate::toxicity::ToxicityOutcome;

/// One persisted toxicity decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Row id, `None` until the record has been stored
    pub id: Option<i64>,
    pub provider: String,
    pub toxicity_score: f64,
    pub categories: Vec<String>,
    /// MD5 of the content, so decisions can be correlated without keeping the text
    pub content_hash: String,
    /// Raw content, only when content capture is enabled
    pub content: Option<String>,
    pub metadata: Map<String, Value>,
    pub language: String,
    /// block / flag / warn / none
    pub action_taken: String,
    pub created_at: String,
}

impl DetectionRecord {
    pub fn from_outcome(
        content: &str,
        outcome: &ToxicityOutcome,
        language: LanguageTag,
        action: Action,
        store_content: bool,
    ) -> Self {
        Self {
            id: None,
            provider: outcome.provider.clone(),
            toxicity_score: outcome.score,
            categories: outcome.categories.clone(),
            content_hash: fingerprint(content, &Map::new()),
            content: store_content.then(|| content.to_string()),
            metadata: outcome.metadata.clone(),
            language: language.as_str().to_string(),
            action_taken: action.as_str().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
