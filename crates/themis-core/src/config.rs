// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;

/// Themis Core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL or SQLite connection URL
    pub database_url: String,
    /// HTTP server address
    pub http_addr: SocketAddr,
    /// Accepted API keys for the check endpoints
    pub api_keys: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `THEMIS_DATABASE_URL`: PostgreSQL or SQLite connection string
    /// - `THEMIS_API_KEYS`: comma-separated list of accepted API keys
    ///
    /// Optional (with defaults):
    /// - `THEMIS_HTTP_PORT`: HTTP server port (default: 3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("THEMIS_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("THEMIS_DATABASE_URL"))?;

        let http_port: u16 = std::env::var("THEMIS_HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("THEMIS_HTTP_PORT", "must be a valid port number")
            })?;

        let api_keys: Vec<String> = std::env::var("THEMIS_API_KEYS")
            .map_err(|_| ConfigError::Missing("THEMIS_API_KEYS"))?
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if api_keys.is_empty() {
            return Err(ConfigError::Invalid(
                "THEMIS_API_KEYS",
                "must contain at least one key",
            ));
        }

        Ok(Self {
            database_url,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            api_keys,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to set env vars for a test and restore them after
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("THEMIS_DATABASE_URL", "postgres://localhost/themis");
        guard.set("THEMIS_API_KEYS", "key-1");
        guard.remove("THEMIS_HTTP_PORT");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "postgres://localhost/themis");
        assert_eq!(config.http_addr.port(), 3000);
        assert_eq!(config.api_keys, vec!["key-1".to_string()]);
    }

    #[test]
    fn test_config_from_env_custom_port_and_multiple_keys() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("THEMIS_DATABASE_URL", "sqlite:themis.db");
        guard.set("THEMIS_API_KEYS", "key-1, key-2 ,key-3");
        guard.set("THEMIS_HTTP_PORT", "8080");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "sqlite:themis.db");
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.api_keys.len(), 3);
        assert_eq!(config.api_keys[1], "key-2");
    }

    #[test]
    fn test_config_missing_database_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.remove("THEMIS_DATABASE_URL");
        guard.set("THEMIS_API_KEYS", "key-1");

        let result = Config::from_env();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Missing("THEMIS_DATABASE_URL")));
        assert!(err.to_string().contains("THEMIS_DATABASE_URL"));
    }

    #[test]
    fn test_config_missing_api_keys() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("THEMIS_DATABASE_URL", "postgres://localhost/themis");
        guard.remove("THEMIS_API_KEYS");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::Missing("THEMIS_API_KEYS")
        ));
    }

    #[test]
    fn test_config_empty_api_keys() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("THEMIS_DATABASE_URL", "postgres://localhost/themis");
        guard.set("THEMIS_API_KEYS", " , ,");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::Invalid("THEMIS_API_KEYS", _)
        ));
    }

    #[test]
    fn test_config_invalid_http_port() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("THEMIS_DATABASE_URL", "postgres://localhost/themis");
        guard.set("THEMIS_API_KEYS", "key-1");
        guard.set("THEMIS_HTTP_PORT", "not_a_number");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::Invalid("THEMIS_HTTP_PORT", _)
        ));
    }

    #[test]
    fn test_config_http_port_out_of_range() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("THEMIS_DATABASE_URL", "postgres://localhost/themis");
        guard.set("THEMIS_API_KEYS", "key-1");
        guard.set("THEMIS_HTTP_PORT", "99999"); // > 65535

        let result = Config::from_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_error_display() {
        let missing = ConfigError::Missing("MY_VAR");
        assert_eq!(
            missing.to_string(),
            "missing required environment variable: MY_VAR"
        );

        let invalid = ConfigError::Invalid("MY_VAR", "must be a number");
        assert_eq!(
            invalid.to_string(),
            "invalid value for MY_VAR: must be a number"
        );
    }
}
