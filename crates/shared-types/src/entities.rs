//! # Core Entities
//!
//! Value types exchanged between a transaction coordinator and the
//! participants embedded in each service.

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

/// Maximum length of a transaction id (the participant column is 255 wide).
pub const MAX_TRANSACTION_ID_LEN: usize = 255;

// =============================================================================
// TRANSACTION ID
// =============================================================================

/// Coordinator-supplied, globally unique transaction identifier.
///
/// The participant never generates ids; it only checks that one is usable
/// as a primary key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    /// Validates and wraps a raw id.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyTransactionId);
        }
        if raw.len() > MAX_TRANSACTION_ID_LEN {
            return Err(ValidationError::TransactionIdTooLong {
                len: raw.len(),
                max: MAX_TRANSACTION_ID_LEN,
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TransactionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// TRANSACTION STATUS
// =============================================================================

/// Persisted status of a participant transaction.
///
/// There is no `Pending`: a record only exists once it has been prepared.
///
/// ```text
/// (absent) ──prepare──→ [Prepared] ──commit──→ [Committed]
///                           │
///                           └── abort ──→ [Aborted] ──delete──→ (absent)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Prepared,
    Committed,
    Aborted,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepared => "prepared",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        }
    }

    /// True once no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Prepared)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prepared" => Ok(Self::Prepared),
            "committed" => Ok(Self::Committed),
            "aborted" => Ok(Self::Aborted),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

// =============================================================================
// CALLER IDENTITY
// =============================================================================

/// Authenticated caller, as asserted by an access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(SubjectId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_rejects_empty() {
        assert_eq!(
            TransactionId::parse("   "),
            Err(ValidationError::EmptyTransactionId)
        );
    }

    #[test]
    fn test_transaction_id_rejects_oversized() {
        let raw = "x".repeat(MAX_TRANSACTION_ID_LEN + 1);
        assert!(matches!(
            TransactionId::parse(raw),
            Err(ValidationError::TransactionIdTooLong { len: 256, max: 255 })
        ));
    }

    #[test]
    fn test_transaction_id_deserialize_validates() {
        let ok: TransactionId = serde_json::from_str("\"tx1\"").unwrap();
        assert_eq!(ok.as_str(), "tx1");

        let bad: Result<TransactionId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_status_strings() {
        for status in [
            TransactionStatus::Prepared,
            TransactionStatus::Committed,
            TransactionStatus::Aborted,
        ] {
            assert_eq!(status.as_str().parse::<TransactionStatus>(), Ok(status));
        }
        assert!("pending".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_only_prepared_is_open() {
        assert!(!TransactionStatus::Prepared.is_terminal());
        assert!(TransactionStatus::Committed.is_terminal());
        assert!(TransactionStatus::Aborted.is_terminal());
    }

    #[test]
    fn test_subject_id_is_transparent_in_json() {
        assert_eq!(serde_json::to_string(&SubjectId(7)).unwrap(), "7");
        assert_eq!("7".parse::<SubjectId>().unwrap(), SubjectId(7));
    }
}
