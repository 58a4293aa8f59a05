// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the survey form service.
//!
//! Every field has a serde default so a partial file (or none at all) yields a
//! working local setup. [`Config::from_env`] layers environment overrides on
//! top of the defaults.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the survey form service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Submission store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Visitor cookie configuration
    #[serde(default)]
    pub cookies: CookieConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Which store backs the submission recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// InfluxDB 1.x over HTTP
    Influx,
    /// Process-local store, lost on restart
    Memory,
}

/// Submission store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection (default: influx)
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// InfluxDB base URL (default: http://127.0.0.1:8086)
    #[serde(default = "default_influx_url")]
    pub url: String,

    /// InfluxDB database name (default: survey)
    #[serde(default = "default_database")]
    pub database: String,

    /// Measurement submissions are written to (default: survey)
    #[serde(default = "default_database")]
    pub measurement: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Lookback for duplicate submissions in seconds (default: 86400)
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,

    /// Per-request timeout against the store in milliseconds (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Visitor cookie configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Lifetime of the visitor cookie set in seconds (default: 30 days)
    #[serde(default = "default_cookie_max_age_secs")]
    pub max_age_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_backend() -> StoreBackend {
    StoreBackend::Influx
}

fn default_influx_url() -> String {
    "http://127.0.0.1:8086".to_string()
}

fn default_database() -> String {
    "survey".to_string()
}

fn default_dedup_window_secs() -> u64 {
    86_400
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_cookie_max_age_secs() -> u64 {
    86_400 * 30
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            store: StoreConfig::default(),
            cookies: CookieConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_influx_url(),
            database: default_database(),
            measurement: default_database(),
            username: None,
            password: None,
            dedup_window_secs: default_dedup_window_secs(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_cookie_max_age_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl StoreConfig {
    /// Get the duplicate-submission lookback
    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    /// Get the per-request store timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CookieConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let backend = match lookup("STORE_BACKEND").as_deref().map(str::trim) {
            Some("memory") => StoreBackend::Memory,
            Some("influx") => StoreBackend::Influx,
            _ => defaults.store.backend,
        };

        Config {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            store: StoreConfig {
                backend,
                url: lookup("INFLUX_URL").unwrap_or(defaults.store.url),
                database: lookup("INFLUX_DATABASE").unwrap_or(defaults.store.database),
                measurement: lookup("INFLUX_MEASUREMENT").unwrap_or(defaults.store.measurement),
                username: lookup("INFLUX_USERNAME").filter(|v| !v.is_empty()),
                password: lookup("INFLUX_PASSWORD").filter(|v| !v.is_empty()),
                dedup_window_secs: parse_var(&lookup, "DEDUP_WINDOW_SECS")
                    .unwrap_or(defaults.store.dedup_window_secs),
                timeout_ms: parse_var(&lookup, "INFLUX_TIMEOUT_MS").unwrap_or(defaults.store.timeout_ms),
            },
            cookies: CookieConfig {
                max_age_secs: parse_var(&lookup, "COOKIE_MAX_AGE_SECS")
                    .unwrap_or(defaults.cookies.max_age_secs),
            },
            metrics: MetricsConfig {
                enabled: parse_var(&lookup, "METRICS_ENABLED").unwrap_or(defaults.metrics.enabled),
                ..defaults.metrics
            },
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
