// Database queries: decisions and cache entries.
//
// All SQL lives here; SqliteDatabase wraps these behind the async traits.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::DetectionRecord;

// --- Decisions ---

/// Store a decision and return its row id.
pub fn insert_detection(conn: &Connection, record: &DetectionRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO toxicity_detections
            (provider, toxicity_score, categories, content_hash, content,
             metadata, language, action_taken, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.provider,
            record.toxicity_score,
            serde_json::to_string(&record.categories)?,
            record.content_hash,
            record.content,
            serde_json::to_string(&record.metadata)?,
            record.language,
            record.action_taken,
            record.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent decisions first.
pub fn recent_detections(conn: &Connection, limit: u32) -> Result<Vec<DetectionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, provider, toxicity_score, categories, content_hash, content,
                metadata, language, action_taken, created_at
         FROM toxicity_detections
         ORDER BY created_at DESC, id DESC
         LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, Option<String>>(7)?,
            row.get::<_, Option<String>>(8)?,
            row.get::<_, String>(9)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, provider, score, categories, hash, content, metadata, language, action, created_at) =
            row?;
        records.push(DetectionRecord {
            id: Some(id),
            provider,
            toxicity_score: score,
            categories: match categories {
                Some(json) => serde_json::from_str(&json)?,
                None => Vec::new(),
            },
            content_hash: hash,
            content,
            metadata: match metadata {
                Some(json) => serde_json::from_str(&json)?,
                None => Default::default(),
            },
            language: language.unwrap_or_default(),
            action_taken: action.unwrap_or_else(|| "none".to_string()),
            created_at,
        });
    }
    Ok(records)
}

/// Count decisions grouped by action, most frequent first.
pub fn action_counts(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(action_taken, 'none'), COUNT(*)
         FROM toxicity_detections
         GROUP BY 1
         ORDER BY 2 DESC, 1",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

// --- Cache entries ---

/// Fetch a cache value that hasn't expired as of `now` (unix seconds).
pub fn get_cache_entry(conn: &Connection, key: &str, now: i64) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
            params![key, now],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Upsert a cache value.
pub fn put_cache_entry(conn: &Connection, key: &str, value: &str, expires_at: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO cache_entries (key, value, expires_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = ?2, expires_at = ?3",
        params![key, value, expires_at],
    )?;
    Ok(())
}

/// Delete expired cache rows and return how many went.
pub fn purge_expired_cache(conn: &Connection, now: i64) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM cache_entries WHERE expires_at <= ?1",
        params![now],
    )?;
    Ok(removed)
}
