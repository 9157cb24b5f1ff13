// Error taxonomy for the filtering core.
//
// Provider and content errors propagate to whoever called `analyze`. Cache
// and sink errors exist so backends can report failures, but the service
// logs and discards them instead of returning them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    /// Input exceeds the provider's maximum length. Raised before any network call.
    #[error("Content is too long. Maximum allowed: {max} bytes, provided: {actual} bytes.")]
    ContentTooLong { max: usize, actual: usize },

    /// Transport or HTTP failure talking to a provider. Not retried.
    #[error("API error from {provider}: {message}")]
    ProviderApi { provider: String, message: String },

    #[error("Toxicity provider '{name}' not found or not configured.")]
    ProviderNotFound { name: String },

    #[error("Cache backend error: {0}")]
    Cache(String),

    #[error("Decision sink error: {0}")]
    Sink(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FilterError {
    pub fn provider_api(provider: &str, message: impl Into<String>) -> Self {
        FilterError::ProviderApi {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn provider_not_found(name: &str) -> Self {
        FilterError::ProviderNotFound {
            name: name.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
