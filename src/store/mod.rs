//! Expiring key-value storage for split records.
//!
//! The [`KeyValueStore`] trait is the only contract the record store relies on:
//! `SET key value EX seconds` and `GET key`. Two backends implement it:
//!
//! - [`RedisStore`] - a Redis server reached through a reconnecting connection manager
//! - [`MemoryStore`] - an in-process map with lazy expiry, for tests and local runs
//!
//! [`StoreBackend`] selects one of them at startup, and [`SplitRecordStore`] layers the
//! `split:{id}` key scheme, JSON encoding and retention window on top.

pub mod memory;
pub mod records;
pub mod redis_store;

pub use memory::*;
pub use records::*;
pub use redis_store::*;

use std::sync::Arc;
use std::time::Duration;

/// Errors surfaced by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No live record exists under the requested id (never created, or expired).
    #[error("Split not found")]
    NotFound,
    /// The backing store could not be reached or rejected the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    /// A stored value could not be decoded as a split record.
    #[error("Malformed split record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Minimal key-value contract with per-key expiry.
pub trait KeyValueStore {
    /// Stores `value` under `key`, replacing any previous value, expiring after `ttl`.
    fn set_ex(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns the live value under `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;
}

impl<T: KeyValueStore + Send + Sync> KeyValueStore for Arc<T> {
    fn set_ex(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.as_ref().set_ex(key, value, ttl)
    }

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        self.as_ref().get(key)
    }
}

/// The backing store chosen from configuration.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Redis(RedisStore),
    Memory(MemoryStore),
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Redis(_) => "redis",
            StoreBackend::Memory(_) => "memory",
        }
    }
}

impl KeyValueStore for StoreBackend {
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        match self {
            StoreBackend::Redis(store) => store.set_ex(key, value, ttl).await,
            StoreBackend::Memory(store) => store.set_ex(key, value, ttl).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            StoreBackend::Redis(store) => store.get(key).await,
            StoreBackend::Memory(store) => store.get(key).await,
        }
    }
}
