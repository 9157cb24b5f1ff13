// Database schema: table creation and migrations.
//
// A `schema_version` table tracks which migrations have run, and each
// migration is a function that executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent: safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per toxicity decision
        CREATE TABLE IF NOT EXISTS toxicity_detections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            provider TEXT NOT NULL,
            toxicity_score REAL NOT NULL,
            categories TEXT,                   -- JSON array of category labels
            content_hash TEXT NOT NULL,        -- MD5 of the content
            content TEXT,                      -- only when content capture is enabled
            metadata TEXT,                     -- provider-specific JSON object
            action_taken TEXT,                 -- block / flag / warn / none
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_detections_score
            ON toxicity_detections(toxicity_score, created_at);

        CREATE INDEX IF NOT EXISTS idx_detections_provider
            ON toxicity_detections(provider, created_at);

        CREATE INDEX IF NOT EXISTS idx_detections_action
            ON toxicity_detections(action_taken, created_at);

        CREATE INDEX IF NOT EXISTS idx_detections_hash
            ON toxicity_detections(content_hash);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: record the detected language with each decision.
    run_migration(conn, 2, |c| {
        c.execute_batch("ALTER TABLE toxicity_detections ADD COLUMN language TEXT;")
    })?;

    // Migration v3: cache store for deployments without a shared cache.
    // expires_at is a unix timestamp in seconds.
    run_migration(conn, 3, |c| {
        c.execute_batch(
            "CREATE TABLE cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX idx_cache_expiry ON cache_entries(expires_at);",
        )
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
