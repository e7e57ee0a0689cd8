//! Flashcards service configuration.
//!
//! Loaded from defaults, then the JSON file named by `FLASHCARDS_CONFIG`,
//! then `FLASHCARDS_*` environment overrides.

use crate::service::{DEFAULT_CACHE_TTL, DEFAULT_KEY_PREFIX};
use serde::{Deserialize, Serialize};
use shared_http::{
    env_override, env_override_duration, load_json_file, AdmissionConfig, ConfigError, CorsConfig,
    HttpConfig, RateLimitConfig,
};
use shared_types::DEFAULT_TOKEN_TTL;
use std::str::FromStr;
use std::time::Duration;
use txn_participant::ParticipantConfig;

pub const ENV_PREFIX: &str = "FLASHCARDS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(format!("unknown cache backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: String,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            ttl: DEFAULT_CACHE_TTL,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashcardsConfig {
    pub http: HttpConfig,
    pub database_url: String,
    /// Shared with the auth service; verifies bearer tokens.
    pub token_secret: String,
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
    pub cache: CacheConfig,
    pub admission: AdmissionConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub participant: ParticipantConfig,
}

impl Default for FlashcardsConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::with_port(5001),
            database_url: "sqlite://flashcards.db".to_string(),
            token_secret: String::new(),
            token_ttl: DEFAULT_TOKEN_TTL,
            cache: CacheConfig::default(),
            admission: AdmissionConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            participant: ParticipantConfig::default(),
        }
    }
}

impl FlashcardsConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(format!("{ENV_PREFIX}_CONFIG")) {
            Ok(path) => load_json_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        let key = |name: &str| format!("{ENV_PREFIX}_{name}");
        env_override(&key("PORT"), &mut self.http.port);
        env_override(&key("DATABASE_URL"), &mut self.database_url);
        env_override(&key("REDIS_URL"), &mut self.cache.redis_url);
        env_override(&key("CACHE_BACKEND"), &mut self.cache.backend);
        env_override(&key("TOKEN_SECRET"), &mut self.token_secret);
        env_override(&key("MAX_CONCURRENT"), &mut self.admission.max_concurrent);
        env_override_duration(&key("ADMISSION_TIMEOUT"), &mut self.admission.acquire_timeout);
        env_override(&key("RATE_LIMIT_PER_MINUTE"), &mut self.rate_limit.requests_per_minute);
        env_override(&key("FINALIZE_POLICY"), &mut self.participant.finalize_policy);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "token_secret must be set ({ENV_PREFIX}_TOKEN_SECRET)"
            )));
        }
        if self.cache.ttl.is_zero() {
            return Err(ConfigError::Invalid("cache.ttl cannot be 0".into()));
        }
        self.admission.validate()?;
        self.rate_limit.validate()?;
        self.participant.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> FlashcardsConfig {
        FlashcardsConfig {
            token_secret: "secret".into(),
            ..FlashcardsConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = valid();
        assert_eq!(config.http.port, 5001);
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.cache.key_prefix, "flashcard_set_");
        assert_eq!(config.admission.max_concurrent, 10);
        assert_eq!(config.rate_limit.requests_per_minute, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secret_required() {
        assert!(FlashcardsConfig::default().validate().is_err());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = valid();
        config.cache.ttl = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: FlashcardsConfig = serde_json::from_str(
            r#"{"cache": {"backend": "memory", "ttl": "1m"}, "admission": {"acquire_timeout": "5s"}}"#,
        )
        .unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.cache.key_prefix, "flashcard_set_");
        assert_eq!(config.admission.acquire_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.admission.max_concurrent, 10);
    }
}
