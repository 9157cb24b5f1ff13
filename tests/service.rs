// Composition tests for the decision service.
//
// These wire real providers (the offline mock, or OpenAI against a wiremock
// server) into ToxicityFilter and check provider selection, caching,
// logging and threshold decisions end to end.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use toxfilter::cache::{MemoryCache, ResultCache};
use toxfilter::config::{FilterConfig, ProviderConfig, ThresholdConfig};
use toxfilter::db::{DecisionSink, DetectionRecord};
use toxfilter::language::LanguageTag;
use toxfilter::policy::Action;
use toxfilter::toxicity::{AnalyzeOptions, ProviderRegistry, ToxicityOutcome, ToxicityProvider};
use toxfilter::{FilterError, Result, ToxicityFilter};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================
// Helpers
// ============================================================

fn mock_config() -> FilterConfig {
    let mut providers = BTreeMap::new();
    providers.insert("mock".to_string(), ProviderConfig::default());
    FilterConfig {
        default: "mock".to_string(),
        providers,
        ..Default::default()
    }
}

fn openai_config(server: &MockServer, cache_enabled: bool) -> FilterConfig {
    let mut config = FilterConfig::default();
    config.default = "openai".to_string();
    config.providers.insert(
        "openai".to_string(),
        ProviderConfig {
            api_key: "test-key".to_string(),
            endpoint: format!("{}/v1/moderations", server.uri()),
            ..Default::default()
        },
    );
    config.cache.enabled = cache_enabled;
    config.logging.enabled = false;
    config
}

async fn mount_moderation(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "modr-1",
            "model": "text-moderation-007",
            "results": [{
                "flagged": false,
                "categories": {"harassment": false},
                "category_scores": {"harassment": 0.42}
            }]
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Collects every record handed to it.
#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<DetectionRecord>>,
}

impl RecordingSink {
    fn records(&self) -> Vec<DetectionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionSink for RecordingSink {
    async fn record(&self, record: &DetectionRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl DecisionSink for FailingSink {
    async fn record(&self, _record: &DetectionRecord) -> Result<()> {
        Err(FilterError::Sink("disk full".to_string()))
    }
}

struct FailingCache;

#[async_trait]
impl ResultCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(FilterError::Cache("connection refused".to_string()))
    }

    async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Err(FilterError::Cache("connection refused".to_string()))
    }
}

/// Reports what the service handed it, with a fixed score.
struct EchoProvider;

#[async_trait]
impl ToxicityProvider for EchoProvider {
    async fn analyze(&self, _text: &str, options: &AnalyzeOptions) -> Result<ToxicityOutcome> {
        let mut metadata = options.base_metadata();
        metadata.insert(
            "normalized_content".to_string(),
            options
                .normalized_content
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        Ok(ToxicityOutcome::new(0.1, vec![], "echo").with_metadata(metadata))
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn max_content_length(&self) -> Option<usize> {
        None
    }
}

fn build_echo(_config: &ProviderConfig) -> Result<Box<dyn ToxicityProvider>> {
    Ok(Box::new(EchoProvider))
}

fn echo_filter() -> ToxicityFilter {
    let mut registry = ProviderRegistry::builtin();
    registry.register("echo", build_echo);

    let mut config = FilterConfig::default();
    config.default = "echo".to_string();
    config
        .providers
        .insert("echo".to_string(), ProviderConfig::default());
    config.logging.enabled = false;
    ToxicityFilter::with_registry(config, &registry)
}

// ============================================================
// Provider selection
// ============================================================

#[tokio::test]
async fn default_provider_is_used_when_none_is_named() {
    let filter = ToxicityFilter::new(mock_config());
    let outcome = filter
        .analyze("hello there", None, AnalyzeOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.provider, "mock");
}

#[tokio::test]
async fn providers_without_credentials_are_not_available() {
    let mut config = mock_config();
    config
        .providers
        .insert("openai".to_string(), ProviderConfig::default());
    config
        .providers
        .insert("unheard_of".to_string(), ProviderConfig::default());

    let filter = ToxicityFilter::new(config);
    let available: Vec<String> = filter.available_providers().into_iter().collect();
    assert_eq!(available, vec!["mock".to_string()]);

    let err = filter
        .analyze("hello", Some("openai"), AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FilterError::ProviderNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn unknown_explicit_provider_is_not_found() {
    let filter = ToxicityFilter::new(mock_config());
    let err = filter
        .analyze("hello", Some("nonexistent"), AnalyzeOptions::default())
        .await
        .unwrap_err();
    match err {
        FilterError::ProviderNotFound { name } => assert_eq!(name, "nonexistent"),
        other => panic!("expected ProviderNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn unavailable_default_surfaces_not_found() {
    let mut config = mock_config();
    config.default = "openai".to_string();
    let filter = ToxicityFilter::new(config);
    let err = filter
        .analyze("hello", None, AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FilterError::ProviderNotFound { .. }));
}

#[tokio::test]
async fn set_default_provider_accepts_only_available_names() {
    let filter = echo_filter();
    assert_eq!(filter.default_provider(), "echo");

    let err = filter.set_default_provider("nonexistent").unwrap_err();
    assert!(matches!(err, FilterError::ProviderNotFound { .. }));
    assert_eq!(filter.default_provider(), "echo");
}

#[tokio::test]
async fn set_default_provider_switches_subsequent_calls() {
    let mut registry = ProviderRegistry::builtin();
    registry.register("echo", build_echo);
    let mut config = mock_config();
    config
        .providers
        .insert("echo".to_string(), ProviderConfig::default());
    let filter = ToxicityFilter::with_registry(config, &registry);

    filter.set_default_provider("echo").unwrap();
    let outcome = filter
        .analyze("hello", None, AnalyzeOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.provider, "echo");
}

#[tokio::test]
async fn provider_lookup_returns_the_instance() {
    let filter = ToxicityFilter::new(mock_config());
    assert_eq!(filter.provider("mock").unwrap().name(), "mock");
    assert!(filter.provider("openai").is_err());
}

// ============================================================
// Options passed to providers
// ============================================================

#[tokio::test]
async fn arabic_text_gets_language_and_normalized_content() {
    let filter = echo_filter();
    let outcome = filter
        .analyze("أَحْمَدُ", None, AnalyzeOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.language(), Some("ar"));
    assert_eq!(outcome.metadata["normalized_content"], "احمد");
}

#[tokio::test]
async fn english_text_has_no_normalized_content() {
    let filter = echo_filter();
    let outcome = filter
        .analyze("hello world", None, AnalyzeOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.language(), Some("en"));
    assert_eq!(outcome.metadata["normalized_content"], Value::Null);
}

#[tokio::test]
async fn caller_supplied_language_is_overridden_by_detection() {
    let filter = echo_filter();
    let options = AnalyzeOptions {
        language: Some(LanguageTag::Arabic),
        ..Default::default()
    };
    let outcome = filter.analyze("plain english", None, options).await.unwrap();
    assert_eq!(outcome.language(), Some("en"));
}

// ============================================================
// Caching
// ============================================================

#[tokio::test]
async fn cache_hit_bypasses_the_provider() {
    let server = MockServer::start().await;
    mount_moderation(&server, 1).await;

    let filter = ToxicityFilter::new(openai_config(&server, true));
    let first = filter
        .analyze("same text", None, AnalyzeOptions::default())
        .await
        .unwrap();
    let second = filter
        .analyze("same text", None, AnalyzeOptions::default())
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn caching_disabled_calls_provider_every_time() {
    let server = MockServer::start().await;
    mount_moderation(&server, 2).await;

    let filter = ToxicityFilter::new(openai_config(&server, false));
    for _ in 0..2 {
        filter
            .analyze("same text", None, AnalyzeOptions::default())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn different_content_is_cached_separately() {
    let server = MockServer::start().await;
    mount_moderation(&server, 2).await;

    let filter = ToxicityFilter::new(openai_config(&server, true));
    filter
        .analyze("first text", None, AnalyzeOptions::default())
        .await
        .unwrap();
    filter
        .analyze("second text", None, AnalyzeOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn caller_options_are_part_of_the_cache_key() {
    let server = MockServer::start().await;
    mount_moderation(&server, 2).await;

    let filter = ToxicityFilter::new(openai_config(&server, true));
    let mut strict = AnalyzeOptions::default();
    strict.extra.insert("strict".to_string(), Value::Bool(true));

    filter
        .analyze("same text", None, AnalyzeOptions::default())
        .await
        .unwrap();
    filter.analyze("same text", None, strict).await.unwrap();
}

#[tokio::test]
async fn broken_cache_never_fails_a_decision() {
    let server = MockServer::start().await;
    mount_moderation(&server, 2).await;

    let filter =
        ToxicityFilter::new(openai_config(&server, true)).with_cache(Arc::new(FailingCache));
    for _ in 0..2 {
        let outcome = filter
            .analyze("same text", None, AnalyzeOptions::default())
            .await
            .unwrap();
        assert!((outcome.score - 0.42).abs() < 1e-9);
    }
}

#[tokio::test]
async fn injected_cache_receives_entries_under_prefixed_keys() {
    let cache = Arc::new(MemoryCache::new());
    let mut config = mock_config();
    config.cache.enabled = true;
    let filter = ToxicityFilter::new(config).with_cache(cache.clone());

    filter
        .analyze("hello", None, AnalyzeOptions::default())
        .await
        .unwrap();

    let key = toxfilter::cache::cache_key(
        "toxicity_filter:",
        "mock",
        LanguageTag::English,
        "hello",
        &serde_json::Map::new(),
    );
    let raw = cache.get(&key).await.unwrap().expect("entry stored");
    let stored: ToxicityOutcome = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored.provider, "mock");
}

#[tokio::test]
async fn injected_cache_is_ignored_while_caching_is_disabled() {
    let cache = Arc::new(MemoryCache::new());
    let filter = ToxicityFilter::new(mock_config()).with_cache(cache.clone());
    filter
        .analyze("hello", None, AnalyzeOptions::default())
        .await
        .unwrap();
    assert!(cache.is_empty().await);
}

// ============================================================
// Logging and persistence
// ============================================================

#[tokio::test]
async fn decisions_are_persisted_without_content_by_default() {
    let sink = Arc::new(RecordingSink::default());
    let filter = ToxicityFilter::new(mock_config()).with_sink(sink.clone());

    filter
        .analyze("you stupid idiot", None, AnalyzeOptions::default())
        .await
        .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.provider, "mock");
    assert_eq!(record.language, "en");
    assert_eq!(record.action_taken, "flag");
    assert_eq!(record.content, None);
    assert_eq!(record.content_hash.len(), 32);
}

#[tokio::test]
async fn content_is_persisted_when_capture_is_enabled() {
    let sink = Arc::new(RecordingSink::default());
    let mut config = mock_config();
    config.logging.store_content = true;
    let filter = ToxicityFilter::new(config).with_sink(sink.clone());

    filter
        .analyze("hello", None, AnalyzeOptions::default())
        .await
        .unwrap();
    assert_eq!(sink.records()[0].content.as_deref(), Some("hello"));
}

#[tokio::test]
async fn logging_disabled_persists_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let mut config = mock_config();
    config.logging.enabled = false;
    let filter = ToxicityFilter::new(config).with_sink(sink.clone());

    filter
        .analyze("hello", None, AnalyzeOptions::default())
        .await
        .unwrap();
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn failing_sink_does_not_fail_analysis() {
    let filter = ToxicityFilter::new(mock_config()).with_sink(Arc::new(FailingSink));
    assert!(filter
        .analyze("hello", None, AnalyzeOptions::default())
        .await
        .is_ok());
}

#[tokio::test]
async fn cache_hits_are_not_persisted_again() {
    let sink = Arc::new(RecordingSink::default());
    let mut config = mock_config();
    config.cache.enabled = true;
    let filter = ToxicityFilter::new(config).with_sink(sink.clone());

    for _ in 0..3 {
        filter
            .analyze("hello", None, AnalyzeOptions::default())
            .await
            .unwrap();
    }
    assert_eq!(sink.records().len(), 1);
}

// ============================================================
// Threshold decisions
// ============================================================

#[tokio::test]
async fn should_predicates_follow_default_thresholds() {
    // Two keywords plus the length factor: 0.7
    let filter = ToxicityFilter::new(mock_config());
    let text = "you stupid idiot";

    assert!(!filter.should_block(text, None).await.unwrap());
    assert!(filter.should_flag(text, None).await.unwrap());
    assert!(filter.should_warn(text, None).await.unwrap());
}

#[tokio::test]
async fn clean_text_triggers_nothing() {
    let filter = ToxicityFilter::new(mock_config());
    let text = "have a lovely day";

    assert!(!filter.should_block(text, None).await.unwrap());
    assert!(!filter.should_flag(text, None).await.unwrap());
    assert!(!filter.should_warn(text, None).await.unwrap());
}

#[tokio::test]
async fn arabic_override_blocks_where_english_does_not() {
    let mut config = mock_config();
    config.languages.thresholds.insert(
        "ar".to_string(),
        ThresholdConfig {
            block: Some(0.65),
            ..Default::default()
        },
    );
    let filter = ToxicityFilter::new(config);

    // Mostly Arabic letters, same two keywords: also 0.7
    let arabic = "مرحبا بكم يا صديقي idiot stupid";
    let english = "you stupid idiot";

    assert!(filter.should_block(arabic, None).await.unwrap());
    assert!(!filter.should_block(english, None).await.unwrap());
}

#[tokio::test]
async fn predicates_propagate_provider_errors() {
    let filter = ToxicityFilter::new(mock_config());
    let err = filter
        .should_block("hello", Some("nonexistent"))
        .await
        .unwrap_err();
    assert!(matches!(err, FilterError::ProviderNotFound { .. }));
}

#[tokio::test]
async fn decide_reports_action_language_and_thresholds() {
    let filter = ToxicityFilter::new(mock_config());

    let decision = filter.decide("you stupid idiot", None).await.unwrap();
    assert_eq!(decision.action, Action::Flag);
    assert_eq!(decision.language, LanguageTag::English);
    assert_eq!(decision.thresholds.block, 0.8);

    let decision = filter.decide("stupid idiot moron", None).await.unwrap();
    assert_eq!(decision.action, Action::Block);

    let decision = filter.decide("hi", None).await.unwrap();
    assert_eq!(decision.action, Action::Allow);
}

#[tokio::test]
async fn resolve_thresholds_reflects_configuration() {
    let mut config = mock_config();
    config.thresholds.warn = Some(0.3);
    let filter = ToxicityFilter::new(config);
    let t = filter.resolve_thresholds(LanguageTag::Arabic);
    assert_eq!((t.block, t.flag, t.warn), (0.8, 0.6, 0.3));
}
