//! Configuration for the split server.
//!
//! Values come from a JSON file (path from `--config` / `$CONFIG`, default `config.json`).
//! Any field missing from the file falls back to an environment variable, then to a
//! hardcoded default. When the default config file does not exist, every field is
//! resolved that way.
//!
//! String-valued fields may reference environment variables instead of holding literals:
//!
//! ```json
//! {
//!   "base_url": "https://split.example.com",
//!   "redis_url": "$REDIS_URL",
//!   "currency": "${SPLIT_CURRENCY}"
//! }
//! ```

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::store::RedisRetryPolicy;

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// CLI arguments for the split server.
#[derive(Parser, Debug)]
#[command(name = "splitpay")]
#[command(about = "Bill splitting HTTP server with shareable payment links")]
struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(long, short, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "config_defaults::default_port")]
    port: u16,
    #[serde(default = "config_defaults::default_host")]
    host: IpAddr,
    #[serde(default = "config_defaults::default_base_url")]
    base_url: LiteralOrEnv<Url>,
    #[serde(default = "config_defaults::default_redis_url")]
    redis_url: Option<LiteralOrEnv<String>>,
    #[serde(default)]
    redis: RedisConfig,
    #[serde(default = "config_defaults::default_currency")]
    currency: LiteralOrEnv<String>,
    #[serde(default = "config_defaults::default_retention_secs")]
    retention_secs: u64,
}

/// Reconnect settings for the Redis connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "config_defaults::default_redis_max_retries")]
    pub max_retries: usize,
    #[serde(default = "config_defaults::default_redis_backoff_factor_ms")]
    pub backoff_factor_ms: u64,
    #[serde(default = "config_defaults::default_redis_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            max_retries: config_defaults::default_redis_max_retries(),
            backoff_factor_ms: config_defaults::default_redis_backoff_factor_ms(),
            max_delay_ms: config_defaults::default_redis_max_delay_ms(),
        }
    }
}

impl From<RedisConfig> for RedisRetryPolicy {
    fn from(config: RedisConfig) -> Self {
        RedisRetryPolicy {
            max_retries: config.max_retries,
            factor_ms: config.backoff_factor_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: config_defaults::default_port(),
            host: config_defaults::default_host(),
            base_url: config_defaults::default_base_url(),
            redis_url: config_defaults::default_redis_url(),
            redis: RedisConfig::default(),
            currency: config_defaults::default_currency(),
            retention_secs: config_defaults::default_retention_secs(),
        }
    }
}

pub mod config_defaults {
    use std::env;
    use std::net::{IpAddr, Ipv4Addr};
    use url::Url;

    use super::LiteralOrEnv;

    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
    pub const DEFAULT_CURRENCY: &str = crate::service::DEFAULT_CURRENCY;
    pub const DEFAULT_RETENTION_SECS: u64 = 30 * 24 * 60 * 60;

    fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
        env::var(name).ok().and_then(|s| s.trim().parse().ok())
    }

    /// Returns the default port value with fallback: $PORT env var -> 8080
    pub fn default_port() -> u16 {
        env_parse("PORT").unwrap_or(DEFAULT_PORT)
    }

    /// Returns the default host value with fallback: $HOST env var -> "0.0.0.0"
    pub fn default_host() -> IpAddr {
        env_parse("HOST").unwrap_or(DEFAULT_HOST)
    }

    /// $BASE_URL env var -> "http://localhost:3000"
    pub fn default_base_url() -> LiteralOrEnv<Url> {
        let url = env_parse("BASE_URL").unwrap_or_else(|| {
            Url::parse(DEFAULT_BASE_URL).expect("default base url is valid")
        });
        LiteralOrEnv::from_literal(url)
    }

    /// $REDIS_URL env var, or none (in-memory store)
    pub fn default_redis_url() -> Option<LiteralOrEnv<String>> {
        env::var("REDIS_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(LiteralOrEnv::from_literal)
    }

    /// $SPLIT_CURRENCY env var -> "ETH"
    pub fn default_currency() -> LiteralOrEnv<String> {
        let currency = env::var("SPLIT_CURRENCY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        LiteralOrEnv::from_literal(currency)
    }

    /// $SPLIT_RETENTION_SECS env var -> 30 days
    pub fn default_retention_secs() -> u64 {
        env_parse("SPLIT_RETENTION_SECS").unwrap_or(DEFAULT_RETENTION_SECS)
    }

    pub fn default_redis_max_retries() -> usize {
        3
    }

    pub fn default_redis_backoff_factor_ms() -> u64 {
        50
    }

    pub fn default_redis_max_delay_ms() -> u64 {
        2000
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("Retention must be at least one second")]
    ZeroRetention,
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// Public URL the `/pay/{id}` links are built on.
    pub fn base_url(&self) -> &Url {
        self.base_url.inner()
    }

    /// Redis connection string; `None` selects the in-memory store.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_ref().map(|url| url.inner().as_str())
    }

    pub fn redis(&self) -> RedisConfig {
        self.redis
    }

    pub fn currency(&self) -> &str {
        self.currency.inner()
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Load configuration from CLI arguments and the JSON file they point to.
    ///
    /// A missing file is only tolerated for the default `config.json` path.
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        let path = cli_args.config;
        if !path.exists() && path == PathBuf::from(DEFAULT_CONFIG_PATH) {
            return Config::default().validate();
        }
        Self::load_from_path(path)
    }

    fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path, e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()
    }

    /// Checks invariants that serde defaults cannot express.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.retention_secs == 0 {
            return Err(ConfigError::ZeroRetention);
        }
        Ok(self)
    }
}

/// A transparent wrapper that resolves environment variables during deserialization.
///
/// Supports both literal values and environment variable references:
/// - Literal: `"redis://localhost:6379"`
/// - Simple env var: `"$REDIS_URL"`
/// - Braced env var: `"${REDIS_URL}"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    /// Returns the variable name if the string matches `$VAR` or `${VAR}` syntax.
    fn parse_env_var_syntax(s: &str) -> Option<&str> {
        if let Some(braced) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            Some(braced)
        } else {
            s.strip_prefix('$').filter(|name| {
                !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
            })
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let value = match Self::parse_env_var_syntax(&s) {
            Some(var_name) => std::env::var(var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "Environment variable '{}' not found (referenced as '{}')",
                    var_name, s
                ))
            })?,
            None => s,
        };

        let parsed = value
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse value: {}", e)))?;

        Ok(LiteralOrEnv(parsed))
    }
}

impl<T: Serialize> Serialize for LiteralOrEnv<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn restore_env(key: &str, original: Option<String>) {
        if let Some(value) = original {
            // Safety: guarded by `ENV_LOCK`, so no concurrent environment mutation occurs.
            unsafe { env::set_var(key, value) };
        } else {
            // Safety: guarded by `ENV_LOCK`, so no concurrent environment mutation occurs.
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    fn test_config_literal_values() {
        let config = Config::from_json(
            r#"{
                "port": 9000,
                "host": "127.0.0.1",
                "base_url": "https://split.example.com",
                "redis_url": "redis://cache:6379/0",
                "redis": { "max_retries": 5 },
                "currency": "USDC",
                "retention_secs": 3600
            }"#,
        )
        .unwrap();
        assert_eq!(config.port(), 9000);
        assert_eq!(config.host(), "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(config.base_url().as_str(), "https://split.example.com/");
        assert_eq!(config.redis_url(), Some("redis://cache:6379/0"));
        assert_eq!(config.redis().max_retries, 5);
        assert_eq!(config.redis().max_delay_ms, 2000);
        assert_eq!(config.currency(), "USDC");
        assert_eq!(config.retention(), Duration::from_secs(3600));
    }

    #[test]
    fn test_config_env_reference() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        let original = env::var("SPLITPAY_TEST_REDIS").ok();
        // Safety: guarded by `ENV_LOCK`, so no concurrent environment mutation occurs.
        unsafe { env::set_var("SPLITPAY_TEST_REDIS", "redis://from-env:6379") };

        let config = Config::from_json(r#"{"redis_url": "${SPLITPAY_TEST_REDIS}"}"#).unwrap();
        assert_eq!(config.redis_url(), Some("redis://from-env:6379"));

        let config = Config::from_json(r#"{"redis_url": "$SPLITPAY_TEST_REDIS"}"#).unwrap();
        assert_eq!(config.redis_url(), Some("redis://from-env:6379"));

        restore_env("SPLITPAY_TEST_REDIS", original);
    }

    #[test]
    fn test_config_missing_env_reference_fails() {
        let result = Config::from_json(r#"{"currency": "$SPLITPAY_TEST_DOES_NOT_EXIST"}"#);
        assert!(matches!(result, Err(ConfigError::JsonParse(_))));
    }

    #[test]
    fn test_config_defaults_from_env() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        let original_port = env::var("PORT").ok();
        let original_base = env::var("BASE_URL").ok();
        // Safety: guarded by `ENV_LOCK`, so no concurrent environment mutation occurs.
        unsafe {
            env::set_var("PORT", "7070");
            env::set_var("BASE_URL", "https://pay.example.org");
        }

        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.port(), 7070);
        assert_eq!(config.base_url().as_str(), "https://pay.example.org/");

        restore_env("PORT", original_port);
        restore_env("BASE_URL", original_base);
    }

    #[test]
    fn test_config_rejects_zero_retention() {
        assert!(matches!(
            Config::from_json(r#"{"retention_secs": 0}"#),
            Err(ConfigError::ZeroRetention)
        ));
    }

    #[test]
    fn test_default_config_rejects_zero_retention_from_env() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        let original = env::var("SPLIT_RETENTION_SECS").ok();
        // Safety: guarded by `ENV_LOCK`, so no concurrent environment mutation occurs.
        unsafe { env::set_var("SPLIT_RETENTION_SECS", "0") };

        assert!(matches!(
            Config::default().validate(),
            Err(ConfigError::ZeroRetention)
        ));

        // Safety: guarded by `ENV_LOCK`, so no concurrent environment mutation occurs.
        unsafe { env::set_var("SPLIT_RETENTION_SECS", "60") };
        let config = Config::default().validate().unwrap();
        assert_eq!(config.retention(), Duration::from_secs(60));

        restore_env("SPLIT_RETENTION_SECS", original);
    }

    #[test]
    fn test_redis_config_into_retry_policy() {
        let policy: RedisRetryPolicy = RedisConfig::default().into();
        assert_eq!(policy, RedisRetryPolicy::default());
    }

    #[test]
    fn test_literal_or_env_syntax() {
        assert_eq!(LiteralOrEnv::<String>::parse_env_var_syntax("$FOO_1"), Some("FOO_1"));
        assert_eq!(LiteralOrEnv::<String>::parse_env_var_syntax("${FOO}"), Some("FOO"));
        assert_eq!(LiteralOrEnv::<String>::parse_env_var_syntax("$"), None);
        assert_eq!(LiteralOrEnv::<String>::parse_env_var_syntax("$foo/bar"), None);
        assert_eq!(LiteralOrEnv::<String>::parse_env_var_syntax("plain"), None);
    }
}
