//! Participant configuration.

use serde::{Deserialize, Serialize};
use shared_http::ConfigError;
use std::time::Duration;

/// How a repeated `commit` on an already committed record is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalizePolicy {
    /// Repeat commits succeed, so coordinator retries after a lost
    /// acknowledgment are safe.
    #[default]
    Idempotent,
    /// Repeat commits fail with `NotFound`.
    Strict,
}

impl std::str::FromStr for FinalizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idempotent" => Ok(FinalizePolicy::Idempotent),
            "strict" => Ok(FinalizePolicy::Strict),
            other => Err(format!("unknown finalize policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    pub finalize_policy: FinalizePolicy,
    /// `PREPARED` rows older than this are aborted by the sweeper.
    #[serde(with = "humantime_serde")]
    pub orphan_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    pub sweeper_enabled: bool,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            finalize_policy: FinalizePolicy::Idempotent,
            orphan_timeout: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(30),
            sweeper_enabled: true,
        }
    }
}

impl ParticipantConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweeper_enabled && self.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "participant.sweep_interval cannot be 0 while the sweeper is enabled".into(),
            ));
        }
        if self.orphan_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "participant.orphan_timeout cannot be 0".into(),
            ));
        }
        Ok(())
    }
}
