//! Persistent memoization for remote ERP reads.
//!
//! This module is independent of the ERP protocol:
//! - Values are serialized to JSON and stored under a string key
//! - Keys are built from structured `CacheKey`s so distinct call signatures never collide
//! - Entries carry an optional expiry, checked lazily on lookup and by `sweep`
//! - Entries can be invalidated by literal key prefix
//! - Empty results are never stored, so a later call retries instead of caching "no data"

mod key;
mod layer;
mod storage;
mod traits;

pub use key::CacheKey;
pub use layer::CacheLayer;
pub use storage::{CacheStorage, CachedBlob, NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, Cacheable};
