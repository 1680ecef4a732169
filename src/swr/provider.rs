//! Cache providers: where resolved payloads survive between runs.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A payload restored from a provider.
#[derive(Debug, Clone)]
pub struct PersistedEntry {
  pub value: Value,
  /// When the payload was fetched
  pub cached_at: DateTime<Utc>,
}

/// Backing store consulted when a key has no in-memory entry yet.
///
/// Restored payloads count as fresh while `cached_at` is inside the key's
/// dedupe interval; older ones are shown as fallback data and revalidated.
pub trait CacheProvider: Send + Sync {
  /// Load the last payload stored for a key.
  fn load(&self, key: &str) -> Result<Option<PersistedEntry>>;

  /// Store the latest payload for a key.
  fn store(&self, key: &str, value: &Value) -> Result<()>;
}

impl<P: CacheProvider + ?Sized> CacheProvider for std::sync::Arc<P> {
  fn load(&self, key: &str) -> Result<Option<PersistedEntry>> {
    (**self).load(key)
  }

  fn store(&self, key: &str, value: &Value) -> Result<()> {
    (**self).store(key, value)
  }
}

/// Provider that doesn't persist anything.
/// Used when persistence is disabled.
pub struct NoopProvider;

impl CacheProvider for NoopProvider {
  fn load(&self, _key: &str) -> Result<Option<PersistedEntry>> {
    Ok(None) // Always miss
  }

  fn store(&self, _key: &str, _value: &Value) -> Result<()> {
    Ok(()) // Discard
  }
}

/// SQLite-backed provider.
pub struct SqliteProvider {
  conn: Mutex<Connection>,
}

impl SqliteProvider {
  /// Open (or create) the provider database, at `path` or the default location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Provider backed by a private in-memory database.
  pub fn in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("sitecache").join("cache.db"))
  }
}

/// Schema for the payload table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS swr_cache (
    key_hash TEXT PRIMARY KEY,
    request_key TEXT NOT NULL,
    payload TEXT NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl CacheProvider for SqliteProvider {
  fn load(&self, key: &str) -> Result<Option<PersistedEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(String, String)> = conn
      .query_row(
        "SELECT payload, cached_at FROM swr_cache WHERE key_hash = ?",
        params![key_hash(key)],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache entry: {}", e))?;

    match row {
      Some((payload, cached_at)) => {
        let value = serde_json::from_str(&payload)
          .map_err(|e| eyre!("Failed to deserialize cached payload for {}: {}", key, e))?;
        Ok(Some(PersistedEntry {
          value,
          cached_at: parse_datetime(&cached_at)?,
        }))
      }
      None => Ok(None),
    }
  }

  fn store(&self, key: &str, value: &Value) -> Result<()> {
    let payload =
      serde_json::to_string(value).map_err(|e| eyre!("Failed to serialize payload: {}", e))?;

    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO swr_cache (key_hash, request_key, payload, cached_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![key_hash(key), key, payload],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }
}

/// SHA256 of the request key, for stable fixed-length primary keys.
fn key_hash(key: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(key.as_bytes());
  hex::encode(hasher.finalize())
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
