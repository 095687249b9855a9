//! Redis-backed [`KeyValueStore`].
//!
//! Uses a [`ConnectionManager`], which multiplexes requests over one connection and
//! reconnects with capped exponential backoff when the server goes away. The handle is
//! created once at startup with [`RedisStore::connect`] and shared by cloning.

use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::fmt;
use std::time::Duration;

use crate::store::{KeyValueStore, StoreError};

/// Reconnect policy for the Redis connection manager.
///
/// Delays grow as `factor_ms * 2^n` and are capped at `max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedisRetryPolicy {
    pub max_retries: usize,
    pub factor_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RedisRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            factor_ms: 50,
            max_delay_ms: 2000,
        }
    }
}

impl RedisRetryPolicy {
    fn manager_config(&self) -> ConnectionManagerConfig {
        ConnectionManagerConfig::new()
            .set_exponent_base(2)
            .set_factor(self.factor_ms)
            .set_number_of_retries(self.max_retries)
            .set_max_delay(self.max_delay_ms)
    }
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        StoreError::Unavailable(error.to_string())
    }
}

impl RedisStore {
    /// Opens a managed connection to the Redis server at `url`.
    ///
    /// Fails if the URL is not a valid Redis connection string or if the initial
    /// connection cannot be established within the retry policy.
    pub async fn connect(url: &str, retry: RedisRetryPolicy) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection = client
            .get_connection_manager_with_config(retry.manager_config())
            .await?;
        Ok(Self { connection })
    }
}

/// Redis `EX` takes whole seconds and rejects zero.
fn expiry_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

impl KeyValueStore for RedisStore {
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(key, value, expiry_secs(ttl))
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_secs_rounds_up() {
        assert_eq!(expiry_secs(Duration::from_secs(2_592_000)), 2_592_000);
        assert_eq!(expiry_secs(Duration::from_millis(1500)), 2);
        assert_eq!(expiry_secs(Duration::ZERO), 1);
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RedisRetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.max_delay_ms, 2000);
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let result = RedisStore::connect("not a redis url", RedisRetryPolicy::default()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
