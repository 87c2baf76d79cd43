//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `product`, `build_id`, or `user_agent` is empty
    /// - `origin` does not parse as an http(s) URL
    /// - `offline_fallback` or a manifest entry is not an absolute path
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.product.is_empty() {
            return Err(ConfigError::Invalid { field: "product".into(), reason: "must not be empty".into() });
        }
        if self.build_id.is_empty() {
            return Err(ConfigError::Invalid { field: "build_id".into(), reason: "must not be empty".into() });
        }
        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("scheme must be http or https, got {}", origin.scheme()),
            });
        }

        if !self.offline_fallback.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "offline_fallback".into(),
                reason: "must be an absolute path".into(),
            });
        }
        for path in &self.precache_manifest {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "precache_manifest".into(),
                    reason: format!("entry must be an absolute path: {path}"),
                });
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if !self.precache_manifest.contains(&self.offline_fallback) {
            tracing::warn!(
                fallback = %self.offline_fallback,
                "offline_fallback is not in precache_manifest; \
                 document requests that fail offline will have no fallback entry"
            );
        }

        Ok(())
    }
}
