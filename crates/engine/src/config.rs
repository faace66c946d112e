//! Engine configuration.

use serde::{Deserialize, Serialize};
use siftql_core::{Error, Result};
use siftql_query::executor::{ExecutorOptions, StatementErrorPolicy};
use std::time::Duration;

/// Tunables of an [`Engine`](crate::Engine).
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Whether batch results are memoized.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    /// Lifetime of a cached batch result, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// `fail_fast` or `skip`.
    #[serde(default)]
    pub statement_errors: StatementErrorPolicy,
    /// Whether `$v -> ALL` over an empty variable matches every row.
    #[serde(default)]
    pub all_matches_empty_variable: bool,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl_secs(),
            statement_errors: StatementErrorPolicy::default(),
            all_matches_empty_variable: false,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))?;
        if !value.is_object() {
            return Err(Error::config("engine configuration must be a JSON object"));
        }
        let config: Self = serde_json::from_value(value).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_enabled && self.cache_ttl_secs == 0 {
            return Err(Error::config(
                "cache_ttl_secs must be positive while the cache is enabled",
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            statement_errors: self.statement_errors,
            all_matches_empty_variable: self.all_matches_empty_variable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.statement_errors, StatementErrorPolicy::FailFast);
        assert!(!config.all_matches_empty_variable);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_json(
            r#"{"cache_ttl_secs": 30, "statement_errors": "skip", "all_matches_empty_variable": true}"#,
        )
        .unwrap();
        assert_eq!(config.cache_ttl_secs, 30);
        let options = config.executor_options();
        assert_eq!(options.statement_errors, StatementErrorPolicy::Skip);
        assert!(options.all_matches_empty_variable);
    }

    #[test]
    fn test_invalid_configs() {
        for json in [
            r#"{"statement_errors": "retry"}"#,
            r#"{"cache_ttl": 30}"#,
            r#"{"cache_ttl_secs": 0}"#,
            "[]",
            "[false, 0]",
            "null",
            "not json",
        ] {
            let err = EngineConfig::from_json(json).unwrap_err();
            assert!(matches!(err, Error::Config { .. }), "{}: {:?}", json, err);
        }

        let config = EngineConfig::from_json(r#"{"cache_enabled": false, "cache_ttl_secs": 0}"#);
        assert!(config.is_ok());
    }
}
