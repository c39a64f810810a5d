//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the API key) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`. Every field has a default so a
//! missing or minimal config file still yields a runnable setup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the upstream API.
    pub base_url: String,
    /// Name of the env var holding the API key.
    pub key_env: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v3.football.api-sports.io".to_string(),
            key_env: "API_SPORTS_KEY".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Rate-limit retry policy: fixed cool-down, bounded attempts.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RetryConfig {
    /// Seconds to wait after a 429 before retrying the identical request.
    pub cooldown_secs: u64,
    /// Total attempts per request, the initial one included.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { cooldown_secs: 60, max_attempts: 3 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite URL for the mirror. `DATABASE_URL` overrides this at runtime.
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { database_url: "sqlite:fixturesync.db".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SyncConfig {
    /// Whether resolving a league's missing country inserts a stub row.
    pub stub_create_countries: bool,
    /// Seconds to pause between per-league sync calls during a full sync.
    pub pace_secs: u64,
    /// Interval for the periodic live-refresh loop (`watch` mode).
    pub live_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stub_create_countries: true,
            pace_secs: 1,
            live_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.base_url, "https://v3.football.api-sports.io");
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.cooldown_secs, 60);
        assert!(cfg.sync.stub_create_countries);
        assert_eq!(cfg.store.database_url, "sqlite:fixturesync.db");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [retry]
            max_attempts = 5

            [sync]
            stub_create_countries = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.cooldown_secs, 60);
        assert!(!cfg.sync.stub_create_countries);
        assert_eq!(cfg.api.key_env, "API_SPORTS_KEY");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let cfg = AppConfig::load_or_default("/nonexistent/config.toml").unwrap();
        assert_eq!(cfg.sync.pace_secs, 1);
    }
}
