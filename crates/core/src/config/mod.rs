//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HOLDFAST_*)
//! 2. TOML config file (if HOLDFAST_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HOLDFAST_*)
/// 2. TOML config file (if HOLDFAST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Product prefix seeding every namespace name.
    ///
    /// Set via HOLDFAST_PRODUCT environment variable.
    #[serde(default = "default_product")]
    pub product: String,

    /// Build identifier for this deployment, e.g. a build timestamp.
    /// Seeds the generation's VersionTag; immutable once deployed.
    ///
    /// Set via HOLDFAST_BUILD_ID environment variable.
    #[serde(default = "default_build_id")]
    pub build_id: String,

    /// Origin the application is served from; manifest paths resolve
    /// against it.
    ///
    /// Set via HOLDFAST_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite namespace store.
    ///
    /// Set via HOLDFAST_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path of the page served when a document request fails both
    /// network and cache.
    ///
    /// Set via HOLDFAST_OFFLINE_FALLBACK environment variable.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// Asset paths fetched and stored during install.
    ///
    /// Set via HOLDFAST_PRECACHE_MANIFEST environment variable.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via HOLDFAST_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via HOLDFAST_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via HOLDFAST_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Take over serving as soon as install completes instead of
    /// waiting for an explicit SKIP_WAITING command.
    ///
    /// Set via HOLDFAST_IMMEDIATE_TAKEOVER environment variable.
    #[serde(default)]
    pub immediate_takeover: bool,
}

fn default_product() -> String {
    "holdfast".into()
}

fn default_build_id() -> String {
    "dev".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./holdfast-store.sqlite")
}

fn default_offline_fallback() -> String {
    "/offline.html".into()
}

fn default_precache_manifest() -> Vec<String> {
    [
        "/",
        "/offline.html",
        "/app.js",
        "/styles.css",
        "/icon-192.png",
        "/icon-512.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_user_agent() -> String {
    "holdfast/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            product: default_product(),
            build_id: default_build_id(),
            origin: default_origin(),
            db_path: default_db_path(),
            offline_fallback: default_offline_fallback(),
            precache_manifest: default_precache_manifest(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            immediate_takeover: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The origin as a parsed URL. Valid after `validate()` has passed.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HOLDFAST_`
    /// 2. TOML file from `HOLDFAST_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HOLDFAST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HOLDFAST_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
