use std::{env, time::Duration};

/// Configuration key holding the cache expiry in seconds.
pub const CACHE_EXPIRY_KEY: &str = "GenericRepository:InMemoryCacheExpiryInSec";

/// Configuration loaded from environment variables or any key lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Cache expiry in seconds (unset when absent or unparsable)
    pub cache_expiry_seconds: Option<u64>,
    /// Maximum number of cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Path to SQLite database file (default: "repokit.db")
    pub sqlite_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GenericRepository__InMemoryCacheExpiryInSec` - Cache expiry in seconds
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "repokit.db")
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(env_var_name(key)).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Keys are `GenericRepository:InMemoryCacheExpiryInSec`,
    /// `CACHE_MAX_ENTRIES` and `SQLITE_PATH`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            cache_expiry_seconds: lookup(CACHE_EXPIRY_KEY).and_then(|v| v.trim().parse().ok()),
            cache_max_entries: lookup("CACHE_MAX_ENTRIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(10_000),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "repokit.db".to_string()),
        }
    }

    /// Get the cache expiry as a Duration, if configured.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_expiry_seconds.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Section separators become double underscores in environment variable names.
fn env_var_name(key: &str) -> String {
    key.replace(':', "__")
}

/// Source of the cache expiry used by cached repositories.
pub trait CacheExpiryProvider: Send + Sync {
    /// Expiry in seconds, or `None` to use the repository default.
    fn cache_expiry_secs(&self) -> Option<u64>;
}

/// Expiry provider backed by [`Config`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigCacheExpiryProvider {
    cache_expiry_secs: Option<u64>,
}

impl ConfigCacheExpiryProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            cache_expiry_secs: config.cache_expiry_seconds,
        }
    }
}

impl CacheExpiryProvider for ConfigCacheExpiryProvider {
    fn cache_expiry_secs(&self) -> Option<u64> {
        self.cache_expiry_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(|_| None);

        assert_eq!(config.cache_expiry_seconds, None);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.sqlite_path, "repokit.db");
        assert_eq!(config.cache_ttl(), None);
    }

    #[test]
    fn test_reads_cache_expiry_key() {
        let config = Config::from_lookup(lookup_from(&[(CACHE_EXPIRY_KEY, "10")]));

        assert_eq!(config.cache_expiry_seconds, Some(10));
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            (CACHE_EXPIRY_KEY, "soon"),
            ("CACHE_MAX_ENTRIES", "-1"),
        ]));

        assert_eq!(config.cache_expiry_seconds, None);
        assert_eq!(config.cache_max_entries, 10_000);
    }

    #[test]
    fn test_env_var_name_replaces_separators() {
        assert_eq!(
            env_var_name(CACHE_EXPIRY_KEY),
            "GenericRepository__InMemoryCacheExpiryInSec"
        );
        assert_eq!(env_var_name("SQLITE_PATH"), "SQLITE_PATH");
    }

    #[test]
    fn test_provider_returns_configured_expiry() {
        let config = Config::from_lookup(lookup_from(&[(CACHE_EXPIRY_KEY, "10")]));
        let provider = ConfigCacheExpiryProvider::new(&config);

        assert_eq!(provider.cache_expiry_secs(), Some(10));
    }

    #[test]
    fn test_provider_returns_none_when_unset() {
        let provider = ConfigCacheExpiryProvider::new(&Config::from_lookup(|_| None));

        assert_eq!(provider.cache_expiry_secs(), None);
    }
}
