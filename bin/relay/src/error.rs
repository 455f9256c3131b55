//! Domain error types for relay startup and the HTTP gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// Errors that stop the relay from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Configuration { reason: String },
    /// The platform token is missing or blank.
    MissingPlatformToken,
    /// The history bound is unusable.
    InvalidMaxTurns { value: usize },
    /// The configured credential list could not be parsed.
    InvalidCredentials,
    /// The completion backend could not be built.
    Backend,
    /// The listen address could not be bound.
    Bind { addr: String, reason: String },
    /// The HTTP server stopped with an error.
    Serve { reason: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => {
                write!(f, "failed to load configuration: {reason}")
            }
            Self::MissingPlatformToken => {
                write!(f, "RELAY_PLATFORM_TOKEN is not set")
            }
            Self::InvalidMaxTurns { value } => {
                write!(f, "max_turns must be at least 1, got {value}")
            }
            Self::InvalidCredentials => write!(f, "invalid RELAY_API_KEYS"),
            Self::Backend => write!(f, "failed to create completion backend"),
            Self::Bind { addr, reason } => {
                write!(f, "failed to bind to {addr}: {reason}")
            }
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// Rejections returned by the HTTP gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayRejection {
    /// Missing or wrong bearer token.
    Unauthorized,
    /// The chat message was empty.
    EmptyMessage,
}

impl fmt::Display for GatewayRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::EmptyMessage => write!(f, "message must not be empty"),
        }
    }
}

impl std::error::Error for GatewayRejection {}

impl IntoResponse for GatewayRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            Self::EmptyMessage => {
                (StatusCode::BAD_REQUEST, "Message must not be empty").into_response()
            }
        }
    }
}
