//! Error types for the credential crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `CredentialError`: Errors from parsing configured credentials

use std::fmt;

/// Errors from credential parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The credential was empty after trimming.
    Empty,
    /// Invalid credential format.
    InvalidFormat {
        /// Position of the offending entry in the configured list.
        position: usize,
        /// Why the entry was rejected.
        reason: String,
    },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "credential is empty"),
            Self::InvalidFormat { position, reason } => {
                write!(f, "invalid credential at position {position}: {reason}")
            }
        }
    }
}

impl std::error::Error for CredentialError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_format_display() {
        let err = CredentialError::InvalidFormat {
            position: 2,
            reason: "contains whitespace".to_string(),
        };
        assert!(err.to_string().contains("position 2"));
        assert!(err.to_string().contains("contains whitespace"));
    }
}
