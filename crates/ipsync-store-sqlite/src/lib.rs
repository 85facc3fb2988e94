// # SQLite History Store
//
// Durable, append-only implementation of HistoryStore backed by a
// single SQLite table.
//
// ## Schema
//
// ```sql
// CREATE TABLE IF NOT EXISTS ip_store (
//     id INTEGER PRIMARY KEY,
//     ip TEXT NOT NULL,
//     updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
// );
// ```
//
// Rows are inserted with only `ip` supplied; `updated_at` defaults to
// the insertion time. The latest record is the row with the maximum
// `updated_at`, tie-broken by `id` so same-second inserts keep their
// insertion order.
//
// The store has exactly one writer and one reader (the Reconciler on
// a single task), so a plain mutex around the connection is enough.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use ipsync_core::traits::history_store::{AddressRecord, HistoryStore};
use ipsync_core::{Error, Result};

/// SQLite-backed history store
///
/// # Example
///
/// ```rust,no_run
/// use ipsync_store_sqlite::SqliteHistoryStore;
/// use ipsync_core::traits::HistoryStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteHistoryStore::open("ip_store.db")?;
///
///     store.append("203.0.113.5").await?;
///     let latest = store.latest().await?;
///     assert_eq!(latest.map(|r| r.address).as_deref(), Some("203.0.113.5"));
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    /// Open (or create) the database and ensure the table exists
    ///
    /// This is the one operation the daemon treats as fatal: without
    /// durable history the system cannot safely operate.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening history database at {}", path.display());

        let conn = Connection::open(path)
            .map_err(|e| Error::persistence(format!("failed to open {}: {}", path.display(), e)))?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (tests, throwaway runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::persistence(format!("failed to open in-memory db: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS ip_store (
                id INTEGER PRIMARY KEY,
                ip TEXT NOT NULL,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .map_err(|e| Error::persistence(format!("failed to create ip_store table: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of records in the history
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ip_store", [], |row| row.get(0))
            .map_err(|e| Error::persistence(format!("failed to count records: {e}")))?;
        Ok(count as usize)
    }

    /// Check if the history is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::persistence("history database lock poisoned"))
    }
}

/// Parse a SQLite timestamp into a UTC datetime
///
/// `CURRENT_TIMESTAMP` yields `YYYY-MM-DD HH:MM:SS`; fractional
/// seconds and RFC 3339 are accepted for rows written by other tools.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::persistence(format!("unparseable timestamp {raw:?}: {e}")))
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn latest(&self) -> Result<Option<AddressRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT ip, updated_at FROM ip_store
                 ORDER BY updated_at DESC, id DESC LIMIT 1",
                [],
                |row| {
                    let ip: String = row.get(0)?;
                    let updated_at: String = row.get(1)?;
                    Ok((ip, updated_at))
                },
            )
            .optional()
            .map_err(|e| Error::persistence(format!("failed to query latest record: {e}")))?;

        match row {
            Some((address, raw)) => Ok(Some(AddressRecord {
                address,
                observed_at: parse_timestamp(&raw)?,
            })),
            None => Ok(None),
        }
    }

    async fn append(&self, address: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO ip_store (ip) VALUES (?1)", params![address])
            .map_err(|e| Error::persistence(format!("failed to insert record: {e}")))?;
        debug!("appended address to history: {}", address);
        Ok(())
    }
}
