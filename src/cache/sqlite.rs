// SQLite cache store: the `cache_entries` table in the decision database.
//
// For single-process deployments that want the cache to survive restarts
// without running a separate cache server.

use std::time::Duration;

use async_trait::async_trait;

use super::ResultCache;
use crate::db::SqliteDatabase;
use crate::error::{FilterError, Result};

#[async_trait]
impl ResultCache for SqliteDatabase {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = chrono::Utc::now().timestamp();
        self.cache_get(key, now)
            .await
            .map_err(|e| FilterError::Cache(format!("{e:#}")))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = chrono::Utc::now().timestamp().saturating_add(ttl_secs);
        self.cache_put(key, &value, expires_at)
            .await
            .map_err(|e| FilterError::Cache(format!("{e:#}")))
    }
}
