// SqliteDatabase: rusqlite backend for the decision sink and cache store.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::DetectionRecord;
use super::traits::DecisionSink;
use crate::error::FilterError;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    pub async fn recent_detections(&self, limit: u32) -> Result<Vec<DetectionRecord>> {
        let conn = self.conn.lock().await;
        super::queries::recent_detections(&conn, limit)
    }

    pub async fn action_counts(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().await;
        super::queries::action_counts(&conn)
    }

    pub async fn cache_get(&self, key: &str, now: i64) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_cache_entry(&conn, key, now)
    }

    pub async fn cache_put(&self, key: &str, value: &str, expires_at: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::put_cache_entry(&conn, key, value, expires_at)
    }

    pub async fn purge_expired_cache(&self, now: i64) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::purge_expired_cache(&conn, now)
    }
}

#[async_trait]
impl DecisionSink for SqliteDatabase {
    async fn record(&self, record: &DetectionRecord) -> crate::error::Result<()> {
        let conn = self.conn.lock().await;
        super::queries::insert_detection(&conn, record)
            .map(|_| ())
            .map_err(|e| FilterError::Sink(format!("{e:#}")))
    }
}
