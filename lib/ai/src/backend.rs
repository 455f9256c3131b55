//! Completion backend abstraction.
//!
//! A backend performs exactly one request against a completion endpoint
//! using the credential it is handed. Choosing credentials and retrying is
//! the job of [`RetryOrchestrator`](crate::retry::RetryOrchestrator).

use crate::error::CompletionFailure;
use async_trait::async_trait;
use chat_relay_conversation::Message;
use chat_relay_credential::ApiKey;

/// Trait for completion backends.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Sends the whole conversation and returns the assistant's reply.
    ///
    /// # Errors
    ///
    /// Returns a failure if the request could not be completed with this
    /// credential for any reason, including timeouts.
    async fn complete(
        &self,
        credential: &ApiKey,
        conversation: &[Message],
    ) -> Result<String, CompletionFailure>;

    /// Returns the model name.
    fn model(&self) -> &str;
}
