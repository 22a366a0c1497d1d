//! Configuration management for the CreatorFeed engine
//!
//! Provides strongly-typed configuration with validation, environment variable parsing,
//! and sensible defaults. Ranker options can additionally be loaded from a TOML file
//! and overridden per key from the environment.
//!
//! # Example
//! ```no_run
//! use creatorfeed::Config;
//! let config = Config::from_env().expect("failed to load config");
//! println!("Listening on {}:{}", config.api.host, config.api.port);
//! ```

use crate::error::{Error, Result};
use crate::recommendation::RankerOptions;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,
    /// Snapshot store configuration
    pub store: StoreConfig,
    /// Explore ranking options
    pub ranker: RankerOptions,
    /// Metrics exporter configuration
    pub metrics: MetricsConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Enable CORS
    pub cors_enabled: bool,
}

/// Snapshot store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// JSON fixture to serve snapshots from; empty store when unset
    pub fixture_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Port for the Prometheus scrape endpoint
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Try to load .env file (ignore if not found)
        dotenvy::dotenv().ok();

        let config = Self {
            api: ApiConfig::from_env()?,
            store: StoreConfig::from_env(),
            ranker: ranker_options_from_env()?,
            metrics: MetricsConfig {
                port: get_env_parsed_or("METRICS_PORT", 9000)?,
            },
        };

        config.validate()?;
        config.log_summary();

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api.host.trim().is_empty() {
            return Err(Error::InvalidConfig {
                key: "API_HOST",
                message: "API host cannot be empty".into(),
            });
        }

        if let Some(path) = &self.store.fixture_path {
            if !path.is_file() {
                return Err(Error::InvalidConfig {
                    key: "SNAPSHOT_FIXTURE_PATH",
                    message: format!("fixture {} does not exist", path.display()).into(),
                });
            }
        }

        Ok(())
    }

    /// Log configuration summary
    fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  API:");
        info!("    Listening on: {}:{}", self.api.host, self.api.port);
        info!("    Request timeout: {:?}", self.api.request_timeout);
        info!("  Store:");
        match &self.store.fixture_path {
            Some(path) => info!("    Fixture: {}", path.display()),
            None => info!("    Fixture: none (empty store)"),
        }
        info!("  Ranker:");
        info!("    Limit per section: {}", self.ranker.limit());
        info!(
            "    Recency half-life: {}h",
            self.ranker.recency_half_life_hours
        );
        info!(
            "    Rising star window: {} days",
            self.ranker.rising_star_window_days
        );
        info!("    Hide fully locked: {}", self.ranker.hide_fully_locked);
        info!("    Content rating gate: {}", self.ranker.content_rating_gate);
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            port: get_env_parsed_or("API_PORT", 8080)?,
            host: get_env_or("API_HOST", "0.0.0.0"),
            request_timeout: Duration::from_secs(get_env_parsed_or(
                "API_REQUEST_TIMEOUT_SECS",
                30,
            )?),
            cors_enabled: get_env_parsed_or("API_CORS_ENABLED", true)?,
        })
    }
}

impl StoreConfig {
    fn from_env() -> Self {
        let path = get_env_or("SNAPSHOT_FIXTURE_PATH", "");
        Self {
            fixture_path: (!path.trim().is_empty()).then(|| PathBuf::from(path.trim())),
        }
    }
}

/// Ranker options from `RANKER_CONFIG_PATH` (TOML) plus per-key env overrides
fn ranker_options_from_env() -> Result<RankerOptions> {
    let mut options = match std::env::var("RANKER_CONFIG_PATH") {
        Ok(path) if !path.trim().is_empty() => {
            let raw = std::fs::read_to_string(path.trim()).map_err(|e| Error::Config {
                message: format!("cannot read ranker config {}", path.trim()).into(),
                source: Some(Box::new(e)),
            })?;
            RankerOptions::from_toml(&raw)?
        }
        _ => RankerOptions::default(),
    };

    if let Some(limit) = get_env_parsed_opt("RANK_LIMIT_PER_SECTION")? {
        options.limit_per_section = limit;
    }
    if let Some(hours) = get_env_parsed_opt("RANK_RECENCY_HALF_LIFE_HOURS")? {
        options.recency_half_life_hours = hours;
    }
    if let Some(hide) = get_env_parsed_opt("RANK_HIDE_FULLY_LOCKED")? {
        options.hide_fully_locked = hide;
    }
    if let Some(days) = get_env_parsed_opt("RANK_RISING_STAR_WINDOW_DAYS")? {
        options.rising_star_window_days = days;
    }
    if let Some(gate) = get_env_parsed_opt("RANK_CONTENT_RATING_GATE")? {
        options.content_rating_gate = gate;
    }

    Ok(options.sanitized())
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get environment variable with default
fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable; set-but-invalid is an error
fn get_env_parsed_opt<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| Error::InvalidConfig {
                key,
                message: format!("Invalid value '{}': {}", value, e).into(),
            }),
        _ => Ok(None),
    }
}

/// Parse an environment variable, falling back to `default` when unset
fn get_env_parsed_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    Ok(get_env_parsed_opt(key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_opt_rejects_garbage() {
        std::env::set_var("CREATORFEED_TEST_BAD_PORT", "eighty");
        let err = get_env_parsed_opt::<u16>("CREATORFEED_TEST_BAD_PORT").unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        std::env::remove_var("CREATORFEED_TEST_BAD_PORT");
    }

    #[test]
    fn test_parsed_or_default() {
        let value: u16 = get_env_parsed_or("CREATORFEED_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_validate_rejects_missing_fixture() {
        let config = Config {
            api: ApiConfig {
                port: 8080,
                host: "127.0.0.1".into(),
                request_timeout: Duration::from_secs(5),
                cors_enabled: false,
            },
            store: StoreConfig {
                fixture_path: Some(PathBuf::from("/no/such/fixture.json")),
            },
            ranker: RankerOptions::default(),
            metrics: MetricsConfig { port: 9000 },
        };
        assert!(config.validate().is_err());
    }
}
