//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};

/// Stored timestamps are second-resolution UTC strings, comparable as text.
const STORED_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A raw cache entry as held by a storage backend.
#[derive(Debug, Clone)]
pub struct CachedBlob {
  /// Serialized value
  pub data: Vec<u8>,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
  /// When the entry stops being served, `None` for entries that never expire
  pub expires_at: Option<DateTime<Utc>>,
}

impl CachedBlob {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at.is_some_and(|expires_at| expires_at <= now)
  }
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Look up a live entry. Expired entries are removed and reported as a miss.
  fn get(&self, key: &str) -> Result<Option<CachedBlob>>;

  /// Write an entry, replacing any previous value under the same key.
  fn put(&self, key: &str, data: &[u8], expires_at: Option<DateTime<Utc>>) -> Result<()>;

  /// Remove every entry whose key starts with `prefix` (literal match).
  fn delete_prefix(&self, prefix: &str) -> Result<usize>;

  /// Remove every expired entry.
  fn sweep_expired(&self) -> Result<usize>;

  /// List stored keys starting with `prefix`, in key order.
  fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}

impl<S: CacheStorage + ?Sized> CacheStorage for Arc<S> {
  fn get(&self, key: &str) -> Result<Option<CachedBlob>> {
    (**self).get(key)
  }

  fn put(&self, key: &str, data: &[u8], expires_at: Option<DateTime<Utc>>) -> Result<()> {
    (**self).put(key, data, expires_at)
  }

  fn delete_prefix(&self, prefix: &str) -> Result<usize> {
    (**self).delete_prefix(prefix)
  }

  fn sweep_expired(&self) -> Result<usize> {
    (**self).sweep_expired()
  }

  fn keys(&self, prefix: &str) -> Result<Vec<String>> {
    (**self).keys(prefix)
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<CachedBlob>> {
    Ok(None) // Always miss
  }

  fn put(&self, _key: &str, _data: &[u8], _expires_at: Option<DateTime<Utc>>) -> Result<()> {
    Ok(()) // Discard
  }

  fn delete_prefix(&self, _prefix: &str) -> Result<usize> {
    Ok(0)
  }

  fn sweep_expired(&self) -> Result<usize> {
    Ok(0)
  }

  fn keys(&self, _prefix: &str) -> Result<Vec<String>> {
    Ok(Vec::new())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }

    let conn = Connection::open(path)?;
    Self::with_connection(conn)
  }

  /// Open the cache database at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Private, throwaway cache. Mostly useful in tests.
  pub fn open_in_memory() -> Result<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
      .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))?;

    Ok(cache_dir.join("odoo-stash").join("cache.db"))
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn.execute_batch(CACHE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|_| Error::LockPoisoned)
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    cached_at TEXT NOT NULL,
    expires_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_expires
    ON cache_entries(expires_at);
"#;

impl CacheStorage for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<CachedBlob>> {
    let conn = self.lock()?;

    let row: Option<(Vec<u8>, String, Option<String>)> = conn
      .query_row(
        "SELECT value, cached_at, expires_at FROM cache_entries WHERE key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()?;

    let Some((data, cached_at, expires_at)) = row else {
      return Ok(None);
    };

    let blob = CachedBlob {
      data,
      cached_at: parse_datetime(&cached_at)?,
      expires_at: expires_at.as_deref().map(parse_datetime).transpose()?,
    };

    if blob.is_expired(Utc::now()) {
      conn.execute("DELETE FROM cache_entries WHERE key = ?", params![key])?;
      return Ok(None);
    }

    Ok(Some(blob))
  }

  fn put(&self, key: &str, data: &[u8], expires_at: Option<DateTime<Utc>>) -> Result<()> {
    let conn = self.lock()?;

    conn.execute(
      "INSERT OR REPLACE INTO cache_entries (key, value, cached_at, expires_at)
       VALUES (?, ?, ?, ?)",
      params![
        key,
        data,
        format_datetime(Utc::now()),
        expires_at.map(format_datetime)
      ],
    )?;

    Ok(())
  }

  fn delete_prefix(&self, prefix: &str) -> Result<usize> {
    let conn = self.lock()?;

    // substr() rather than LIKE: '%' and '_' in the prefix are literal.
    let removed = conn.execute(
      "DELETE FROM cache_entries WHERE substr(key, 1, length(?1)) = ?1",
      params![prefix],
    )?;

    Ok(removed)
  }

  fn sweep_expired(&self) -> Result<usize> {
    let conn = self.lock()?;

    let removed = conn.execute(
      "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?",
      params![format_datetime(Utc::now())],
    )?;

    Ok(removed)
  }

  fn keys(&self, prefix: &str) -> Result<Vec<String>> {
    let conn = self.lock()?;

    let mut stmt = conn.prepare(
      "SELECT key FROM cache_entries WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
    )?;

    let keys = stmt
      .query_map(params![prefix], |row| row.get(0))?
      .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(keys)
  }
}

fn format_datetime(dt: DateTime<Utc>) -> String {
  dt.format(STORED_DATETIME_FORMAT).to_string()
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  NaiveDateTime::parse_from_str(s, STORED_DATETIME_FORMAT)
    .map(|dt| dt.and_utc())
    .map_err(|_| Error::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn storage() -> SqliteStorage {
    SqliteStorage::open_in_memory().unwrap()
  }

  #[test]
  fn test_put_then_get() {
    let storage = storage();
    storage.put("k", b"[1,2,3]", None).unwrap();

    let blob = storage.get("k").unwrap().expect("entry should exist");
    assert_eq!(blob.data, b"[1,2,3]");
    assert!(blob.expires_at.is_none());
  }

  #[test]
  fn test_missing_key_is_a_miss() {
    assert!(storage().get("nothing").unwrap().is_none());
  }

  #[test]
  fn test_expired_entry_is_removed_on_lookup() {
    let storage = storage();
    storage
      .put("old", b"1", Some(Utc::now() - Duration::seconds(10)))
      .unwrap();

    assert!(storage.get("old").unwrap().is_none());
    assert!(storage.keys("").unwrap().is_empty());
  }

  #[test]
  fn test_unexpired_entry_is_served() {
    let storage = storage();
    storage
      .put("fresh", b"1", Some(Utc::now() + Duration::days(1)))
      .unwrap();
    assert!(storage.get("fresh").unwrap().is_some());
  }

  #[test]
  fn test_delete_prefix_is_literal() {
    let storage = storage();
    storage.put("get_pos_orders:2025-07-01", b"1", None).unwrap();
    storage.put("get_pos_orders:2025-07-15", b"1", None).unwrap();
    storage.put("get_pos_orders:2025-08-01", b"1", None).unwrap();
    storage.put("get_purchase_orders:2025-07-01", b"1", None).unwrap();
    storage.put("get_pos_ordersX2025-07", b"1", None).unwrap();

    let removed = storage.delete_prefix("get_pos_orders:2025-07").unwrap();
    assert_eq!(removed, 2);

    let left = storage.keys("").unwrap();
    assert_eq!(
      left,
      vec![
        "get_pos_orders:2025-08-01".to_string(),
        "get_pos_ordersX2025-07".to_string(),
        "get_purchase_orders:2025-07-01".to_string(),
      ]
    );
  }

  #[test]
  fn test_delete_prefix_treats_like_wildcards_literally() {
    let storage = storage();
    storage.put("a_b", b"1", None).unwrap();
    storage.put("axb", b"1", None).unwrap();
    storage.put("a%c", b"1", None).unwrap();

    assert_eq!(storage.delete_prefix("a_").unwrap(), 1);
    assert_eq!(storage.delete_prefix("a%").unwrap(), 1);
    assert_eq!(storage.keys("").unwrap(), vec!["axb".to_string()]);
  }

  #[test]
  fn test_sweep_removes_only_expired() {
    let storage = storage();
    storage.put("forever", b"1", None).unwrap();
    storage
      .put("gone", b"1", Some(Utc::now() - Duration::seconds(1)))
      .unwrap();
    storage
      .put("later", b"1", Some(Utc::now() + Duration::hours(1)))
      .unwrap();

    assert_eq!(storage.sweep_expired().unwrap(), 1);
    assert_eq!(
      storage.keys("").unwrap(),
      vec!["forever".to_string(), "later".to_string()]
    );
  }

  #[test]
  fn test_entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    {
      let storage = SqliteStorage::open(&path).unwrap();
      storage.put("k", b"\"v\"", None).unwrap();
    }

    let reopened = SqliteStorage::open(&path).unwrap();
    let blob = reopened.get("k").unwrap().expect("entry should persist");
    assert_eq!(blob.data, b"\"v\"");
  }

  #[test]
  fn test_noop_storage_never_hits() {
    let storage = NoopStorage;
    storage.put("k", b"1", None).unwrap();
    assert!(storage.get("k").unwrap().is_none());
    assert_eq!(storage.delete_prefix("").unwrap(), 0);
  }
}
