// Configuration: the fully-resolved value the decision service consumes.
//
// The service never reads the environment itself. `load()` is the
// collaborator that builds a FilterConfig, either from a TOML file named by
// TOXFILTER_CONFIG or from environment variables (the .env file is loaded
// by main via dotenvy).

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::language::LanguageTag;
use crate::policy::{self, ThresholdAction};

pub const DEFAULT_PROVIDER: &str = "openai";
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/moderations";
pub const OPENAI_MODEL: &str = "text-moderation-latest";
pub const PERSPECTIVE_ENDPOINT: &str =
    "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";
pub const PERSPECTIVE_ATTRIBUTES: [&str; 6] = [
    "TOXICITY",
    "SEVERE_TOXICITY",
    "IDENTITY_ATTACK",
    "INSULT",
    "PROFANITY",
    "THREAT",
];

/// Top-level configuration. Every section is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Provider used when a call doesn't name one
    #[serde(default = "default_provider")]
    pub default: String,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub languages: LanguageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// SQLite file for the decision log and the sqlite cache store
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            providers: BTreeMap::new(),
            thresholds: ThresholdConfig::default(),
            languages: LanguageConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            db_path: default_db_path(),
        }
    }
}

/// Connection settings for one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    /// OpenAI moderation model
    pub model: Option<String>,
    /// Perspective attributes to request (e.g. TOXICITY, INSULT)
    #[serde(default)]
    pub attributes: Vec<String>,
    /// HTTP timeout in seconds (default 30)
    pub timeout: Option<u64>,
    /// Overrides the provider's built-in input limit
    pub max_content_length: Option<usize>,
    /// Client-side rate limit; unset means no limiting
    pub requests_per_second: Option<f64>,
}

impl ProviderConfig {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.unwrap_or(30)
    }
}

/// Score thresholds. Missing values fall back to the built-in defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub block: Option<f64>,
    pub flag: Option<f64>,
    pub warn: Option<f64>,
}

impl ThresholdConfig {
    pub fn get(&self, action: ThresholdAction) -> Option<f64> {
        match action {
            ThresholdAction::Block => self.block,
            ThresholdAction::Flag => self.flag,
            ThresholdAction::Warn => self.warn,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Per-language overrides keyed by language code ("ar", "en")
    #[serde(default)]
    pub thresholds: HashMap<String, ThresholdConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl: u64,
    /// Backend selector: "memory" (default) or "sqlite"
    pub store: Option<String>,
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: default_cache_ttl(),
            store: None,
            prefix: default_cache_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Include raw content in log records and persisted decisions
    #[serde(default)]
    pub store_content: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            store_content: false,
            log_level: default_log_level(),
        }
    }
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_db_path() -> String {
    "./toxfilter.db".to_string()
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_cache_prefix() -> String {
    "toxicity_filter:".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl FilterConfig {
    /// Parse a TOML document. Does not validate.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse toxfilter configuration")
    }

    /// Build the configuration from environment variables.
    ///
    /// Both OpenAI and Perspective entries are always present; the service
    /// drops whichever has no API key.
    pub fn from_env() -> Result<Self> {
        let mut providers = BTreeMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderConfig {
                api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                endpoint: env::var("OPENAI_MODERATION_ENDPOINT")
                    .unwrap_or_else(|_| OPENAI_ENDPOINT.to_string()),
                model: Some(
                    env::var("OPENAI_MODERATION_MODEL").unwrap_or_else(|_| OPENAI_MODEL.to_string()),
                ),
                ..Default::default()
            },
        );
        providers.insert(
            "perspective".to_string(),
            ProviderConfig {
                api_key: env::var("PERSPECTIVE_API_KEY").unwrap_or_default(),
                endpoint: env::var("PERSPECTIVE_ENDPOINT")
                    .unwrap_or_else(|_| PERSPECTIVE_ENDPOINT.to_string()),
                attributes: PERSPECTIVE_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
                requests_per_second: env_parse("PERSPECTIVE_REQUESTS_PER_SECOND")?,
                ..Default::default()
            },
        );

        Ok(Self {
            default: env::var("TOXICITY_FILTER_PROVIDER").unwrap_or_else(|_| default_provider()),
            providers,
            thresholds: ThresholdConfig {
                block: env_parse("TOXICITY_BLOCK_THRESHOLD")?,
                flag: env_parse("TOXICITY_FLAG_THRESHOLD")?,
                warn: env_parse("TOXICITY_WARN_THRESHOLD")?,
            },
            languages: LanguageConfig::default(),
            cache: CacheConfig {
                enabled: env_parse("TOXICITY_CACHE_ENABLED")?.unwrap_or(false),
                ttl: env_parse("TOXICITY_CACHE_TTL")?.unwrap_or_else(default_cache_ttl),
                store: env::var("TOXICITY_CACHE_STORE").ok(),
                prefix: default_cache_prefix(),
            },
            logging: LoggingConfig {
                enabled: env_parse("TOXICITY_LOGGING_ENABLED")?.unwrap_or(true),
                store_content: env_parse("TOXICITY_STORE_CONTENT")?.unwrap_or(false),
                log_level: env::var("TOXICITY_LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            },
            db_path: env::var("TOXFILTER_DB_PATH").unwrap_or_else(|_| default_db_path()),
        })
    }

    /// Reject thresholds that would classify content out of severity order.
    ///
    /// Checks the global set and every per-language set after fallback
    /// resolution, so a partial override is judged together with the
    /// globals it inherits.
    pub fn validate(&self) -> Result<()> {
        let mut sets = vec![("global".to_string(), policy::resolve_thresholds(self, None))];
        for lang in self.languages.thresholds.keys() {
            sets.push((
                format!("language '{lang}'"),
                policy::resolve_thresholds_for_code(self, lang),
            ));
        }

        for (label, t) in sets {
            for value in [t.block, t.flag, t.warn] {
                if !value.is_finite() {
                    anyhow::bail!("{label} thresholds contain a non-finite value");
                }
            }
            if !(t.warn <= t.flag && t.flag <= t.block) {
                anyhow::bail!(
                    "{label} thresholds out of order: warn {} <= flag {} <= block {} does not hold",
                    t.warn,
                    t.flag,
                    t.block
                );
            }
        }
        Ok(())
    }

    /// Thresholds configured for a language, if any.
    pub fn language_thresholds(&self, language: LanguageTag) -> Option<&ThresholdConfig> {
        self.languages.thresholds.get(language.as_str())
    }
}

/// Load configuration: TOML file when TOXFILTER_CONFIG is set, env otherwise.
/// The result is validated before it is returned.
pub fn load() -> Result<FilterConfig> {
    let config = match env::var("TOXFILTER_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(Path::new(&path))
                .with_context(|| format!("Failed to read configuration file {path}"))?;
            FilterConfig::from_toml_str(&text)?
        }
        Err(_) => FilterConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value: {raw}"))?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}
