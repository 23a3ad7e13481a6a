//! What can be memoized, and how a memoized answer is reported.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for values that can be memoized.
pub trait Cacheable: Serialize + DeserializeOwned {
  /// Whether the value carries no rows. Empty values are never written to the cache.
  fn is_empty_result(&self) -> bool;
}

impl<T: Serialize + DeserializeOwned> Cacheable for Vec<T> {
  fn is_empty_result(&self) -> bool {
    self.is_empty()
  }
}

/// A value together with where it was served from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
  /// Write time of the entry that served a cache hit
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  pub fn is_hit(&self) -> bool {
    self.source == CacheSource::Cache
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the ERP during this call
  Network,
  /// Served from a live cache entry
  Cache,
}
