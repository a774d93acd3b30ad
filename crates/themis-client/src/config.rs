// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the client SDK.

use std::time::Duration;

use crate::error::{ClientError, Result};

/// Configuration for the ThemisClient.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the themis-core server.
    pub app_url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with the given API key and default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            app_url: "http://localhost:3000".to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `THEMIS_API_KEY`: API key (required)
    /// - `THEMIS_APP_URL`: Server base URL (default: "http://localhost:3000")
    /// - `THEMIS_REQUEST_TIMEOUT_MS`: Request timeout in milliseconds (default: 30000)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("THEMIS_API_KEY")
            .map_err(|_| ClientError::Config("THEMIS_API_KEY is not set".to_string()))?;
        if api_key.trim().is_empty() {
            return Err(ClientError::Config("THEMIS_API_KEY is empty".to_string()));
        }

        let app_url = std::env::var("THEMIS_APP_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let request_timeout_ms: u64 = std::env::var("THEMIS_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .map_err(|e| {
                ClientError::Config(format!("invalid THEMIS_REQUEST_TIMEOUT_MS: {}", e))
            })?;

        Ok(Self {
            app_url,
            api_key,
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }

    /// Set the server base URL.
    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

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

    fn clear_all(guard: &mut EnvGuard) {
        guard.remove("THEMIS_API_KEY");
        guard.remove("THEMIS_APP_URL");
        guard.remove("THEMIS_REQUEST_TIMEOUT_MS");
    }

    #[test]
    fn test_from_env_requires_api_key() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);

        assert!(matches!(
            ClientConfig::from_env(),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("THEMIS_API_KEY", "key-1");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.app_url, "http://localhost:3000");
        assert_eq!(config.api_key, "key-1");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_env_with_overrides() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("THEMIS_API_KEY", "key-2");
        guard.set("THEMIS_APP_URL", "https://themis.example.com");
        guard.set("THEMIS_REQUEST_TIMEOUT_MS", "5000");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.app_url, "https://themis.example.com");
        assert_eq!(config.request_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_from_env_rejects_bad_timeout() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("THEMIS_API_KEY", "key-3");
        guard.set("THEMIS_REQUEST_TIMEOUT_MS", "soon");

        assert!(matches!(
            ClientConfig::from_env(),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new("key-4")
            .with_app_url("http://127.0.0.1:8080")
            .with_request_timeout(Duration::from_secs(2));
        assert_eq!(config.app_url, "http://127.0.0.1:8080");
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }
}
