//! Auth service configuration.
//!
//! Loaded from defaults, then the JSON file named by `AUTH_CONFIG`, then
//! `AUTH_*` environment overrides.

use serde::{Deserialize, Serialize};
use shared_http::{
    env_override, env_override_duration, load_json_file, AdmissionConfig, ConfigError, CorsConfig,
    HttpConfig, RateLimitConfig,
};
use shared_types::DEFAULT_TOKEN_TTL;
use std::time::Duration;
use txn_participant::ParticipantConfig;

pub const ENV_PREFIX: &str = "AUTH";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub http: HttpConfig,
    pub database_url: String,
    /// Signs access tokens; the flashcards service must hold the same value.
    pub token_secret: String,
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
    pub admission: AdmissionConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub participant: ParticipantConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::with_port(5000),
            database_url: "sqlite://auth.db".to_string(),
            token_secret: String::new(),
            token_ttl: DEFAULT_TOKEN_TTL,
            admission: AdmissionConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            participant: ParticipantConfig::default(),
        }
    }
}

impl AuthConfig {
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
        if self.token_ttl.is_zero() {
            return Err(ConfigError::Invalid("token_ttl cannot be 0".into()));
        }
        self.admission.validate()?;
        self.rate_limit.validate()?;
        self.participant.validate()?;
        Ok(())
    }
}
