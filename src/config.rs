//! Configuration management for the Image Tools server

use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible origin used when building download links.
    /// When unset the origin is derived from the request's Host header.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub trust_proxy: bool,
    pub max_upload_bytes: usize,
    pub transform_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                public_url: None,
            },
            storage: StorageConfig {
                dir: PathBuf::from("./uploads"),
                retention_secs: 600,
                sweep_interval_secs: 600,
            },
            limits: LimitsConfig {
                rate_limit_max: 100,
                rate_limit_window_secs: 15 * 60,
                trust_proxy: true,
                max_upload_bytes: 25 * 1024 * 1024,
                transform_timeout_secs: 30,
            },
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Each variable falls back to its default on its own; a malformed value
    /// is logged and never discards the variables around it.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Config {
            server: ServerConfig {
                host: text("HOST").unwrap_or(defaults.server.host),
                port: parse_or(&lookup, "PORT", defaults.server.port),
                public_url: text("PUBLIC_URL"),
            },
            storage: StorageConfig {
                dir: text("STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.dir),
                retention_secs: parse_or(&lookup, "RETENTION_SECS", defaults.storage.retention_secs),
                sweep_interval_secs: parse_or(
                    &lookup,
                    "SWEEP_INTERVAL_SECS",
                    defaults.storage.sweep_interval_secs,
                ),
            },
            limits: LimitsConfig {
                rate_limit_max: parse_or(&lookup, "RATE_LIMIT_MAX", defaults.limits.rate_limit_max),
                rate_limit_window_secs: parse_or(
                    &lookup,
                    "RATE_LIMIT_WINDOW_SECS",
                    defaults.limits.rate_limit_window_secs,
                ),
                trust_proxy: flag_or(&lookup, "TRUST_PROXY", defaults.limits.trust_proxy),
                max_upload_bytes: parse_or(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    defaults.limits.max_upload_bytes,
                ),
                transform_timeout_secs: parse_or(
                    &lookup,
                    "TRANSFORM_TIMEOUT_SECS",
                    defaults.limits.transform_timeout_secs,
                ),
            },
        }
    }

    /// True when the server binds every interface
    pub fn binds_wildcard(&self) -> bool {
        self.server
            .host
            .parse::<IpAddr>()
            .map(|ip| ip.is_unspecified())
            .unwrap_or(false)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.storage.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.storage.sweep_interval_secs.max(1))
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.limits.rate_limit_window_secs.max(1))
    }

    pub fn transform_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.transform_timeout_secs.max(1))
    }
}

/// Parse `key` through `lookup`, keeping `default` when unset or malformed
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, value = %value, default = %default, "Ignoring invalid config value");
                default
            }
        },
        _ => default,
    }
}

/// Boolean variant of [`parse_or`]; accepts true/false, 1/0, yes/no and on/off
fn flag_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => match parse_flag(&value) {
            Some(flag) => flag,
            None => {
                tracing::warn!(key, value = %value, default, "Ignoring invalid config flag");
                default
            }
        },
        _ => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
