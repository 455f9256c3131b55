//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `CompletionFailure`: One failed request made with one credential
//! - `ExhaustedFailure`: Terminal outcome of the retry loop
//! - `BackendError`: Problems constructing a completion backend

use std::fmt;

/// Maximum number of response body characters kept in a failure.
const MAX_BODY_CHARS: usize = 200;

/// A single completion attempt failed.
///
/// Every variant is treated the same way by the retry loop: the credential
/// used for the attempt is evicted. The distinction is kept for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionFailure {
    /// The endpoint rejected the credential.
    Unauthorized { status: u16 },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Any other non-success HTTP status.
    Status { status: u16, body: String },
    /// The endpoint answered with an error object instead of choices.
    Provider { message: String },
    /// Timeout waiting for response.
    Timeout,
    /// The request never got a response.
    Transport { reason: String },
    /// Response parsing failed.
    MalformedResponse { reason: String },
}

impl CompletionFailure {
    /// Creates a `Status` failure, truncating the body.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate(body),
        }
    }

    /// Short machine-friendly name of the failure kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::Status { .. } => "status",
            Self::Provider { .. } => "provider",
            Self::Timeout => "timeout",
            Self::Transport { .. } => "transport",
            Self::MalformedResponse { .. } => "malformed_response",
        }
    }
}

impl fmt::Display for CompletionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { status } => {
                write!(f, "credential rejected with HTTP {status}")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::Status { status, body } => {
                write!(f, "completion endpoint returned HTTP {status}: {body}")
            }
            Self::Provider { message } => {
                write!(f, "completion provider error: {message}")
            }
            Self::Timeout => write!(f, "completion request timed out"),
            Self::Transport { reason } => {
                write!(f, "completion request failed: {reason}")
            }
            Self::MalformedResponse { reason } => {
                write!(f, "failed to parse completion response: {reason}")
            }
        }
    }
}

impl std::error::Error for CompletionFailure {}

/// The retry loop gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExhaustedFailure {
    /// The credential pool has no keys at all.
    NoCredentialsConfigured,
    /// Every attempt in the budget failed.
    AllCredentialsFailed {
        /// Attempts made before giving up.
        attempts: usize,
        /// Failure of the final attempt.
        last_failure: Option<CompletionFailure>,
    },
}

impl fmt::Display for ExhaustedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentialsConfigured => write!(f, "no credentials configured"),
            Self::AllCredentialsFailed {
                attempts,
                last_failure,
            } => {
                write!(f, "all credentials failed after {attempts} attempts")?;
                if let Some(failure) = last_failure {
                    write!(f, " (last: {failure})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ExhaustedFailure {}

/// Errors constructing a completion backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => {
                write!(f, "invalid completion backend configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for BackendError {}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_BODY_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_failure_display() {
        let err = CompletionFailure::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(err.to_string().contains("30s"));
        assert_eq!(err.kind(), "rate_limited");
    }

    #[test]
    fn status_body_is_truncated() {
        let body = "x".repeat(500);
        let CompletionFailure::Status { status, body } = CompletionFailure::status(502, &body)
        else {
            panic!("expected status failure");
        };
        assert_eq!(status, 502);
        assert_eq!(body.len(), MAX_BODY_CHARS + 3);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn exhausted_failure_display() {
        let err = ExhaustedFailure::AllCredentialsFailed {
            attempts: 3,
            last_failure: Some(CompletionFailure::Timeout),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("3 attempts"));
        assert!(rendered.contains("timed out"));

        assert_eq!(
            ExhaustedFailure::NoCredentialsConfigured.to_string(),
            "no credentials configured"
        );
    }
}
