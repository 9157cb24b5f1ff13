// Result cache: get/put-with-TTL over serialized outcomes.
//
// The decision service only needs this contract; which backend sits behind
// it is a deployment choice. Keys are built from the provider, the detected
// language and a content fingerprint, so the same text scored by two
// providers (or detected differently) never shares an entry.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::language::LanguageTag;

pub use memory::MemoryCache;

#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Fetch a live entry. Expired entries behave as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

/// Lower-case hex MD5 of the content, with caller options folded in.
///
/// Not a security boundary; it only has to be deterministic. Options are
/// appended as JSON (serde_json maps keep keys sorted), and only when
/// present, so plain calls hash exactly the content.
pub fn fingerprint(content: &str, extra: &Map<String, Value>) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    if !extra.is_empty() {
        hasher.update(b"\0");
        hasher.update(Value::Object(extra.clone()).to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// `{prefix}{provider}:{language}:{fingerprint}`
pub fn cache_key(
    prefix: &str,
    provider: &str,
    language: LanguageTag,
    content: &str,
    extra: &Map<String, Value>,
) -> String {
    format!(
        "{prefix}{provider}:{}:{}",
        language.as_str(),
        fingerprint(content, extra)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_plain_md5_without_options() {
        // md5("hello")
        assert_eq!(
            fingerprint("hello", &Map::new()),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn test_options_change_fingerprint() {
        let mut extra = Map::new();
        extra.insert("strict".to_string(), Value::Bool(true));
        assert_ne!(fingerprint("hello", &extra), fingerprint("hello", &Map::new()));
    }

    #[test]
    fn test_cache_key_layout() {
        let key = cache_key(
            "toxicity_filter:",
            "openai",
            LanguageTag::English,
            "hello",
            &Map::new(),
        );
        assert_eq!(
            key,
            "toxicity_filter:openai:en:5d41402abc4b2a76b9719d911017c592"
        );
    }
}
