//! Configuration pieces common to both services.
//!
//! Each service composes these into its own config struct and loads it the
//! same way: defaults, then an optional JSON file, then environment
//! overrides. A bad override value is logged and ignored.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl HttpConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::with_port(8080)
    }
}

/// Admission controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Permits per service instance.
    pub max_concurrent: usize,
    /// Longest a request waits for a permit; `None` or zero waits forever.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            acquire_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl AdmissionConfig {
    /// The effective wait bound. A zero timeout means no bound, as in
    /// `*_ADMISSION_TIMEOUT=0`.
    pub fn wait_limit(&self) -> Option<Duration> {
        self.acquire_timeout.filter(|limit| !limit.is_zero())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "admission.max_concurrent cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// Per-IP rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_minute: u32,
    pub burst_size: u32,
    /// How often idle client entries are dropped.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 5,
            burst_size: 5,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.requests_per_minute == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.requests_per_minute cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `["*"]` allows any origin.
    pub allowed_origins: Vec<String>,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age_secs: 60 * 60,
        }
    }
}

/// Reads a JSON config file. Missing fields take their defaults.
pub fn load_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Overwrites `target` with the parsed value of env var `key`, if set.
pub fn env_override<T>(key: &str, target: &mut T)
where
    T: FromStr,
    T::Err: Display,
{
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.parse() {
        Ok(value) => {
            info!("{key} set from environment");
            *target = value;
        }
        Err(e) => warn!("Invalid {key} value {raw:?}: {e}, keeping previous value"),
    }
}

/// Like `env_override`, for humantime durations (`30s`, `5m`). `0` or
/// `none` clears the value.
pub fn env_override_duration(key: &str, target: &mut Option<Duration>) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    let trimmed = raw.trim();
    if trimmed == "0" || trimmed.eq_ignore_ascii_case("none") {
        info!("{key} cleared from environment");
        *target = None;
        return;
    }
    match humantime_serde::re::humantime::parse_duration(trimmed) {
        Ok(value) => {
            info!("{key} set from environment");
            *target = Some(value);
        }
        Err(e) => warn!("Invalid {key} value {raw:?}: {e}, keeping previous value"),
    }
}
