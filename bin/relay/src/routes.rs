//! HTTP gateway the chat platform bridge talks to.

use crate::error::GatewayRejection;
use crate::relay::ChatRelay;
use axum::{
    Json, Router,
    extract::{FromRef, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
};
use chat_relay_ai::CompletionBackend;
use chat_relay_core::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Bearer token expected from the platform bridge.
#[derive(Clone)]
pub struct PlatformToken(Arc<str>);

impl PlatformToken {
    /// Wraps the configured token.
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self(Arc::from(token))
    }

    /// Compares without exiting early on the first differing byte.
    fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

/// Shared gateway state.
pub struct AppState<B: CompletionBackend> {
    pub relay: Arc<ChatRelay<B>>,
    pub platform_token: PlatformToken,
}

impl<B: CompletionBackend> AppState<B> {
    /// Creates gateway state owning the relay.
    pub fn new(relay: ChatRelay<B>, platform_token: PlatformToken) -> Self {
        Self {
            relay: Arc::new(relay),
            platform_token,
        }
    }
}

impl<B: CompletionBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            relay: Arc::clone(&self.relay),
            platform_token: self.platform_token.clone(),
        }
    }
}

impl<B: CompletionBackend> FromRef<AppState<B>> for PlatformToken {
    fn from_ref(state: &AppState<B>) -> Self {
        state.platform_token.clone()
    }
}

/// Extractor that rejects requests without the platform's bearer token.
pub struct RequirePlatform;

impl<S> FromRequestParts<S> for RequirePlatform
where
    PlatformToken: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GatewayRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let expected = PlatformToken::from_ref(state);
        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(GatewayRejection::Unauthorized)?;

        if !expected.matches(presented) {
            tracing::warn!(path = %parts.uri.path(), "Rejected request with wrong platform token");
            return Err(GatewayRejection::Unauthorized);
        }

        Ok(RequirePlatform)
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: UserId,
    pub message: String,
}

/// Body of `POST /reset`.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub user_id: UserId,
}

/// Text sent back to the chat platform.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyBody {
    pub reply: String,
}

/// Builds the gateway router.
pub fn router<B: CompletionBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat::<B>))
        .route("/reset", post(reset::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn chat<B: CompletionBackend>(
    _platform: RequirePlatform,
    State(state): State<AppState<B>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ReplyBody>, GatewayRejection> {
    if request.message.trim().is_empty() {
        return Err(GatewayRejection::EmptyMessage);
    }

    let reply = state.relay.chat(&request.user_id, &request.message).await;
    Ok(Json(ReplyBody { reply }))
}

async fn reset<B: CompletionBackend>(
    _platform: RequirePlatform,
    State(state): State<AppState<B>>,
    Json(request): Json<ResetRequest>,
) -> Json<ReplyBody> {
    let reply = state.relay.reset(&request.user_id).await;
    Json(ReplyBody {
        reply: reply.to_string(),
    })
}
