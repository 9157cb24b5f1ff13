// Toxicity decision service: the orchestrator.
//
// Picks a provider, consults the cache, detects the language, and turns a
// provider score into an action using per-language thresholds.
//
//   text -> language detection -> cache lookup (provider, language, fingerprint)
//        -> provider.analyze on miss -> cache store -> log + persist -> outcome
//
// Provider and content errors propagate to the caller; there is no fallback
// between providers. Cache and sink failures are logged and swallowed, so a
// broken cache or database only costs latency and history, never a decision.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn, Level};

use crate::cache::{self, MemoryCache, ResultCache};
use crate::config::FilterConfig;
use crate::db::{DecisionSink, DetectionRecord};
use crate::error::{FilterError, Result};
use crate::language::{detect_language, normalize_arabic_text, LanguageTag};
use crate::policy::{self, classify, Action, ResolvedThresholds, ThresholdAction};
use crate::toxicity::{AnalyzeOptions, ProviderRegistry, ToxicityOutcome, ToxicityProvider};

/// A scored outcome together with the action it maps to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub outcome: ToxicityOutcome,
    pub language: LanguageTag,
    pub thresholds: ResolvedThresholds,
    pub action: Action,
}

pub struct ToxicityFilter {
    /// Built once at construction; only configured providers make it in
    providers: HashMap<String, Box<dyn ToxicityProvider>>,
    /// The one piece of runtime-mutable state
    default_provider: RwLock<String>,
    config: FilterConfig,
    cache: Option<Arc<dyn ResultCache>>,
    sink: Option<Arc<dyn DecisionSink>>,
}

impl ToxicityFilter {
    /// Build a service with the built-in providers.
    pub fn new(config: FilterConfig) -> Self {
        Self::with_registry(config, &ProviderRegistry::builtin())
    }

    /// Build a service, constructing providers from `registry`.
    ///
    /// Every provider listed in the configuration is instantiated; unknown
    /// names, constructor failures and providers that report themselves
    /// unconfigured are left out of the service.
    pub fn with_registry(config: FilterConfig, registry: &ProviderRegistry) -> Self {
        let mut providers: HashMap<String, Box<dyn ToxicityProvider>> = HashMap::new();

        for (name, provider_config) in &config.providers {
            match registry.build(name, provider_config) {
                None => warn!(provider = %name, "No toxicity provider registered under this name"),
                Some(Err(e)) => warn!(provider = %name, error = %e, "Failed to construct provider"),
                Some(Ok(provider)) if provider.is_configured() => {
                    providers.insert(name.clone(), provider);
                }
                Some(Ok(_)) => {
                    debug!(provider = %name, "Provider missing credentials or endpoint, skipped")
                }
            }
        }

        let cache: Option<Arc<dyn ResultCache>> = if config.cache.enabled {
            Some(Arc::new(MemoryCache::new()))
        } else {
            None
        };

        info!(
            providers = ?providers.keys().collect::<BTreeSet<_>>(),
            default = %config.default,
            cache = config.cache.enabled,
            "Toxicity filter ready"
        );

        Self {
            providers,
            default_provider: RwLock::new(config.default.clone()),
            config,
            cache,
            sink: None,
        }
    }

    /// Replace the cache backend. Only consulted when caching is enabled.
    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach the sink that receives each decision when logging is enabled.
    pub fn with_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Score `content`, using the named provider or the current default.
    pub async fn analyze(
        &self,
        content: &str,
        provider: Option<&str>,
        options: AnalyzeOptions,
    ) -> Result<ToxicityOutcome> {
        let provider_name = self.resolve_provider_name(provider);

        let language = detect_language(content);
        let mut options = options;
        options.language = Some(language);
        if language == LanguageTag::Arabic {
            options.normalized_content = Some(normalize_arabic_text(content));
        }

        let cache_key = self.active_cache().map(|_| {
            cache::cache_key(
                &self.config.cache.prefix,
                &provider_name,
                language,
                content,
                &options.extra,
            )
        });

        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache_lookup(key).await {
                debug!(provider = %provider_name, "Toxicity cache hit");
                return Ok(hit);
            }
        }

        let provider = self.provider(&provider_name)?;
        let outcome = provider.analyze(content, &options).await?;

        if let Some(key) = &cache_key {
            self.cache_store(key, &outcome).await;
        }

        if self.config.logging.enabled {
            self.log_outcome(content, &outcome, language);
            self.persist(content, &outcome, language).await;
        }

        Ok(outcome)
    }

    pub async fn should_block(&self, content: &str, provider: Option<&str>) -> Result<bool> {
        self.meets_threshold(content, provider, ThresholdAction::Block)
            .await
    }

    pub async fn should_flag(&self, content: &str, provider: Option<&str>) -> Result<bool> {
        self.meets_threshold(content, provider, ThresholdAction::Flag)
            .await
    }

    pub async fn should_warn(&self, content: &str, provider: Option<&str>) -> Result<bool> {
        self.meets_threshold(content, provider, ThresholdAction::Warn)
            .await
    }

    /// Analyze and classify in one step.
    pub async fn decide(&self, content: &str, provider: Option<&str>) -> Result<Decision> {
        let outcome = self
            .analyze(content, provider, AnalyzeOptions::default())
            .await?;
        let language = detect_language(content);
        let thresholds = self.resolve_thresholds(language);
        let action = classify(outcome.score, &thresholds);

        Ok(Decision {
            outcome,
            language,
            thresholds,
            action,
        })
    }

    /// Thresholds in effect for `language`, after fallback.
    pub fn resolve_thresholds(&self, language: LanguageTag) -> ResolvedThresholds {
        policy::resolve_thresholds(&self.config, Some(language))
    }

    /// Names of the providers that passed the configuration check.
    pub fn available_providers(&self) -> BTreeSet<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn default_provider(&self) -> String {
        self.default_provider
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Switch the default provider. Only already-available providers are accepted.
    pub fn set_default_provider(&self, name: &str) -> Result<()> {
        if !self.providers.contains_key(name) {
            return Err(FilterError::provider_not_found(name));
        }
        *self
            .default_provider
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = name.to_string();
        Ok(())
    }

    pub fn provider(&self, name: &str) -> Result<&dyn ToxicityProvider> {
        self.providers
            .get(name)
            .map(|p| p.as_ref())
            .ok_or_else(|| FilterError::provider_not_found(name))
    }

    fn resolve_provider_name(&self, provider: Option<&str>) -> String {
        match provider {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.default_provider(),
        }
    }

    async fn meets_threshold(
        &self,
        content: &str,
        provider: Option<&str>,
        action: ThresholdAction,
    ) -> Result<bool> {
        let outcome = self
            .analyze(content, provider, AnalyzeOptions::default())
            .await?;
        // Detection is cheap and deterministic, so recompute rather than
        // trusting whatever the provider put in metadata.
        let language = detect_language(content);
        let threshold = policy::resolve_threshold(&self.config, Some(language), action);
        Ok(outcome.score >= threshold)
    }

    fn active_cache(&self) -> Option<&Arc<dyn ResultCache>> {
        self.cache.as_ref().filter(|_| self.config.cache.enabled)
    }

    /// A failed or undecodable read is a miss.
    async fn cache_lookup(&self, key: &str) -> Option<ToxicityOutcome> {
        let cache = self.active_cache()?;
        match cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!(error = %e, "Discarding undecodable toxicity cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Cache operation failed in toxicity filter");
                None
            }
        }
    }

    /// Best effort; failures are logged and dropped.
    async fn cache_store(&self, key: &str, outcome: &ToxicityOutcome) {
        let Some(cache) = self.active_cache() else {
            return;
        };
        let ttl = Duration::from_secs(self.config.cache.ttl);
        let stored = match outcome.to_json() {
            Ok(raw) => cache.put(key, raw, ttl).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            warn!(error = %e, "Cache storage failed in toxicity filter");
        }
    }

    fn log_outcome(&self, content: &str, outcome: &ToxicityOutcome, language: LanguageTag) {
        let content_field = self.config.logging.store_content.then_some(content);

        macro_rules! emit {
            ($level:expr) => {
                tracing::event!(
                    $level,
                    toxicity_score = outcome.score,
                    provider = %outcome.provider,
                    categories = ?outcome.categories,
                    language = %language,
                    content = content_field,
                    "Toxicity detection result"
                )
            };
        }

        match self.config.logging.log_level.to_ascii_lowercase().as_str() {
            "trace" => emit!(Level::TRACE),
            "debug" => emit!(Level::DEBUG),
            "warn" | "warning" => emit!(Level::WARN),
            "error" => emit!(Level::ERROR),
            _ => emit!(Level::INFO),
        }
    }

    /// Hand the decision to the sink. Best effort, like the cache.
    async fn persist(&self, content: &str, outcome: &ToxicityOutcome, language: LanguageTag) {
        let Some(sink) = &self.sink else {
            return;
        };
        let action = classify(outcome.score, &self.resolve_thresholds(language));
        let record = DetectionRecord::from_outcome(
            content,
            outcome,
            language,
            action,
            self.config.logging.store_content,
        );
        if let Err(e) = sink.record(&record).await {
            warn!(error = %e, provider = %outcome.provider, "Failed to persist toxicity decision");
        }
    }
}
