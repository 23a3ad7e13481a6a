//! Cache layer that orchestrates memoization around remote fetches.

use chrono::{Duration, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::key::CacheKey;
use super::storage::{CacheStorage, NoopStorage, SqliteStorage};
use super::traits::{CacheResult, Cacheable};
use crate::config::CacheConfig;
use crate::error::Result;

/// Cache layer that manages memoization logic around fetches.
///
/// This layer sits between the ERP accessors and the storage backend,
/// providing get-or-compute semantics with optional per-entry expiry.
#[derive(Clone)]
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  /// Skip lookups (but still write), forcing every call to hit the network
  refresh: bool,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      refresh: false,
    }
  }

  /// Open the store described by the cache section, or a disabled layer.
  pub fn open(config: &CacheConfig) -> Result<Self> {
    if !config.enabled {
      return Ok(Self::disabled());
    }
    let storage = match &config.path {
      Some(path) => SqliteStorage::open(path)?,
      None => SqliteStorage::open_default()?,
    };
    Ok(Self::new(storage).with_refresh(config.refresh))
  }

  /// A layer that never stores anything.
  pub fn disabled() -> Self {
    Self::new(NoopStorage)
  }

  pub fn with_refresh(mut self, refresh: bool) -> Self {
    self.refresh = refresh;
    self
  }

  /// Look up a live entry.
  ///
  /// An entry that no longer deserializes into `T` is reported as a miss.
  pub fn lookup<T: Cacheable>(&self, key: &CacheKey) -> Result<Option<CacheResult<T>>> {
    let rendered = key.render();
    let Some(blob) = self.storage.get(&rendered)? else {
      return Ok(None);
    };

    match serde_json::from_slice::<T>(&blob.data) {
      Ok(data) => {
        debug!(key = %rendered, "using cached result");
        Ok(Some(CacheResult::from_cache(data, blob.cached_at)))
      }
      Err(e) => {
        warn!(key = %rendered, error = %e, "ignoring unreadable cache entry");
        Ok(None)
      }
    }
  }

  /// Store `value` under `key`. Empty values are skipped; returns whether a write happened.
  pub fn store<T: Cacheable>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>) -> Result<bool> {
    if value.is_empty_result() {
      debug!(key = %key, "empty result, not caching");
      return Ok(false);
    }

    let data = serde_json::to_vec(value)?;
    // A TTL reaching past the last representable date never expires
    let expires_at = ttl.and_then(|ttl| Utc::now().checked_add_signed(ttl));
    debug!(key = %key, ttl_secs = ttl.map(|t| t.num_seconds()), "setting cached result");
    self.storage.put(&key.render(), &data, expires_at)?;
    Ok(true)
  }

  /// Return the cached value for `key`, or run `compute` and cache its output.
  ///
  /// 1. Check cache - if live (and not refreshing), return immediately
  /// 2. Otherwise compute
  /// 3. Store the computed value unless it is empty
  ///
  /// Errors from `compute` propagate and leave the cache untouched.
  pub async fn get_or_compute<T, F, Fut>(
    &self,
    key: &CacheKey,
    ttl: Option<Duration>,
    compute: F,
  ) -> Result<CacheResult<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if !self.refresh {
      if let Some(cached) = self.lookup(key)? {
        return Ok(cached);
      }
    }

    let data = compute().await?;
    self.store(key, &data, ttl)?;
    Ok(CacheResult::from_network(data))
  }

  /// Delete every entry whose key starts with the literal `prefix`.
  pub fn invalidate(&self, prefix: &str) -> Result<usize> {
    let removed = self.storage.delete_prefix(prefix)?;
    debug!(prefix, removed, "invalidated cache entries");
    Ok(removed)
  }

  /// Delete every expired entry.
  pub fn sweep(&self) -> Result<usize> {
    self.storage.sweep_expired()
  }

  pub fn keys(&self, prefix: &str) -> Result<Vec<String>> {
    self.storage.keys(prefix)
  }
}
