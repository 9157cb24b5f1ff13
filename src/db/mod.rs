// Database layer: SQLite storage for persisted decisions and cached outcomes.
//
// We use rusqlite with the "bundled" feature so there's no system SQLite
// dependency. The database file lives wherever TOXFILTER_DB_PATH points
// (defaults to ./toxfilter.db).

pub mod models;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod queries;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use models::DetectionRecord;
pub use traits::DecisionSink;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

#[cfg(feature = "sqlite")]
use anyhow::{Context, Result};
#[cfg(feature = "sqlite")]
use rusqlite::Connection;
#[cfg(feature = "sqlite")]
use std::path::Path;
#[cfg(feature = "sqlite")]
use std::sync::Arc;
#[cfg(feature = "sqlite")]
use tracing::{info, warn};

#[cfg(feature = "sqlite")]
use crate::config::FilterConfig;
#[cfg(feature = "sqlite")]
use crate::service::ToxicityFilter;

/// Open (or create) the database and run migrations.
///
/// Called by `toxfilter init` and by any command that writes decisions.
#[cfg(feature = "sqlite")]
pub fn initialize(db_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    // WAL lets readers (history) run alongside the writer
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing database (fails if it doesn't exist yet).
#[cfg(feature = "sqlite")]
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `toxfilter init` first.",
            db_path
        );
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    Ok(conn)
}

/// Build the filter with the SQLite sink and, if selected, the SQLite cache store.
///
/// A database that can't be opened or purged never blocks a decision: the
/// filter is built without the sink and SQLite cache instead.
#[cfg(feature = "sqlite")]
pub async fn filter_with_storage(config: FilterConfig) -> ToxicityFilter {
    let use_sqlite_cache = config.cache.enabled && config.cache.store.as_deref() == Some("sqlite");
    let logging = config.logging.enabled;
    if !logging && !use_sqlite_cache {
        return ToxicityFilter::new(config);
    }

    let db = match initialize(&config.db_path) {
        Ok(conn) => Arc::new(SqliteDatabase::new(conn)),
        Err(e) => {
            warn!(
                db_path = %config.db_path,
                error = %format!("{e:#}"),
                "Decision database unavailable, continuing without history or SQLite cache"
            );
            return ToxicityFilter::new(config);
        }
    };

    let mut filter = ToxicityFilter::new(config);
    if use_sqlite_cache {
        match db.purge_expired_cache(chrono::Utc::now().timestamp()).await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "Removed expired cache entries"),
            Err(e) => warn!(error = %format!("{e:#}"), "Failed to purge expired cache entries"),
        }
        filter = filter.with_cache(db.clone());
    }
    if logging {
        filter = filter.with_sink(db);
    }
    filter
}
