//! Document lifecycle state machine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle state shared by invoices and purchase bills
///
/// `Draft -> Confirmed -> Posted` is one-way; `Posted` is terminal. A draft
/// or confirmed document may instead be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Confirmed,
    Posted,
    Cancelled,
}

impl DocumentStatus {
    /// Returns true if the document may still be posted
    pub fn can_post(&self) -> bool {
        matches!(self, DocumentStatus::Draft | DocumentStatus::Confirmed)
    }

    /// Returns the storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Confirmed => "confirmed",
            DocumentStatus::Posted => "posted",
            DocumentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown document status string
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown document status: {0}")]
pub struct ParseDocumentStatusError(pub String);

impl FromStr for DocumentStatus {
    type Err = ParseDocumentStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DocumentStatus::Draft),
            "confirmed" => Ok(DocumentStatus::Confirmed),
            "posted" => Ok(DocumentStatus::Posted),
            "cancelled" => Ok(DocumentStatus::Cancelled),
            other => Err(ParseDocumentStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postable_states() {
        assert!(DocumentStatus::Draft.can_post());
        assert!(DocumentStatus::Confirmed.can_post());
        assert!(!DocumentStatus::Posted.can_post());
        assert!(!DocumentStatus::Cancelled.can_post());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::Confirmed,
            DocumentStatus::Posted,
            DocumentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<DocumentStatus>().unwrap(), status);
        }
    }
}
