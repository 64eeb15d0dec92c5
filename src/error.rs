//! Error types for ferro-consensus.
//!
//! The consensus table is all-or-nothing per export cycle: classification
//! and normalization errors abort the run rather than producing a partially
//! filled table. History lookups that find nothing are not errors.

use thiserror::Error;

/// Main error type for ferro-consensus operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// A lab call carries a classification outside the 5-tier vocabulary.
    #[error("invalid classification '{value}' from lab {lab} for variant {variant}")]
    InvalidClassification {
        lab: String,
        variant: String,
        value: String,
    },

    /// A reference/alternate pair that cannot be normalized.
    #[error("malformed allele pair: ref '{reference}', alt '{alternate}'")]
    MalformedAllele {
        reference: String,
        alternate: String,
    },

    /// A configured lab's data could not be retrieved or was empty.
    #[error("missing data for lab {lab}: {reason}")]
    MissingLabData { lab: String, reason: String },

    /// Invalid run configuration.
    #[error("config error: {msg}")]
    Config { msg: String },

    /// IO error (for file operations).
    #[error("IO error: {msg}")]
    Io { msg: String },

    /// Delimited table parsing or writing error.
    #[error("table error: {msg}")]
    Table { msg: String },
}

impl ConsensusError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        ConsensusError::Config { msg: msg.into() }
    }

    /// Create a missing-lab-data error.
    pub fn missing_lab(lab: impl Into<String>, reason: impl Into<String>) -> Self {
        ConsensusError::MissingLabData {
            lab: lab.into(),
            reason: reason.into(),
        }
    }

    /// True if the error indicates bad input data rather than an IO problem.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ConsensusError::InvalidClassification { .. } | ConsensusError::MalformedAllele { .. }
        )
    }
}

impl From<std::io::Error> for ConsensusError {
    fn from(err: std::io::Error) -> Self {
        ConsensusError::Io {
            msg: err.to_string(),
        }
    }
}

impl From<csv::Error> for ConsensusError {
    fn from(err: csv::Error) -> Self {
        ConsensusError::Table {
            msg: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConsensusError {
    fn from(err: serde_json::Error) -> Self {
        ConsensusError::Io {
            msg: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ConsensusError {
    fn from(err: toml::de::Error) -> Self {
        ConsensusError::Config {
            msg: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_classification() {
        let err = ConsensusError::InvalidClassification {
            lab: "lab1".to_string(),
            variant: "1_123_A_C_ABC1".to_string(),
            value: "maybe".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lab1"));
        assert!(msg.contains("maybe"));
        assert!(msg.contains("1_123_A_C_ABC1"));
    }

    #[test]
    fn test_is_data_error() {
        assert!(ConsensusError::MalformedAllele {
            reference: String::new(),
            alternate: String::new(),
        }
        .is_data_error());
        assert!(!ConsensusError::missing_lab("lab1", "fetch failed").is_data_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConsensusError = io_err.into();
        assert!(matches!(err, ConsensusError::Io { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_error_equality() {
        let a = ConsensusError::missing_lab("lab1", "empty");
        let b = ConsensusError::missing_lab("lab1", "empty");
        assert_eq!(a, b);
        assert_ne!(a, ConsensusError::missing_lab("lab2", "empty"));
    }
}
