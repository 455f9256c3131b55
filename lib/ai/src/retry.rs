//! Credential-rotating retry loop.
//!
//! Each attempt draws a key from the shared [`CredentialPool`] and hands it
//! to the backend. A failed attempt evicts that key from the pool's current
//! generation and the loop tries again. When the pool runs dry it is reset
//! from the configured key set, so a second pass over every key is possible
//! within one request.
//!
//! The attempt budget defaults to the number of configured keys, not the
//! number currently available, which bounds the loop even across resets.

use crate::backend::CompletionBackend;
use crate::error::{CompletionFailure, ExhaustedFailure};
use chat_relay_conversation::Message;
use chat_relay_credential::{Acquired, CredentialPool};
use std::sync::Arc;
use std::time::Duration;

/// Timing and budget for the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempt budget. `None` uses the number of configured keys.
    pub max_attempts: Option<usize>,
    /// Pause after a failed attempt.
    pub backoff: Duration,
    /// Pause after refilling an exhausted pool.
    pub reset_delay: Duration,
}

impl RetryPolicy {
    /// A policy with no pauses, for tests and local tooling.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            max_attempts: None,
            backoff: Duration::ZERO,
            reset_delay: Duration::ZERO,
        }
    }

    /// Sets an explicit attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            backoff: Duration::from_millis(500),
            reset_delay: Duration::from_secs(1),
        }
    }
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The assistant's reply.
    pub content: String,
    /// Attempts made, including the successful one.
    pub attempts: usize,
}

/// Runs completions against a backend, rotating through the credential pool.
pub struct RetryOrchestrator<B: CompletionBackend> {
    pool: Arc<CredentialPool>,
    backend: B,
    policy: RetryPolicy,
}

impl<B: CompletionBackend> RetryOrchestrator<B> {
    /// Creates an orchestrator sharing the given pool.
    pub fn new(pool: Arc<CredentialPool>, backend: B, policy: RetryPolicy) -> Self {
        Self {
            pool,
            backend,
            policy,
        }
    }

    /// Returns the attempt budget for one request.
    #[must_use]
    pub fn max_attempts(&self) -> usize {
        self.policy
            .max_attempts
            .unwrap_or_else(|| self.pool.len_all())
    }

    /// Returns the credential pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sends the conversation, retrying with other keys until one succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ExhaustedFailure::NoCredentialsConfigured`] without calling
    /// the backend if the pool has no keys, and
    /// [`ExhaustedFailure::AllCredentialsFailed`] once the attempt budget is
    /// spent.
    pub async fn complete(&self, conversation: &[Message]) -> Result<Completion, ExhaustedFailure> {
        if self.pool.is_unconfigured() {
            tracing::error!("No API keys configured, cannot request a completion");
            return Err(ExhaustedFailure::NoCredentialsConfigured);
        }

        let max_attempts = self.max_attempts();
        let mut attempts = 0;
        let mut last_failure: Option<CompletionFailure> = None;

        while attempts < max_attempts {
            if self.pool.len_available() == 0 {
                tracing::warn!("All available API keys have failed, resetting key pool");
                self.pool.reset();
                tokio::time::sleep(self.policy.reset_delay).await;
            }

            // Other requests may evict the refilled keys before this draw;
            // `acquire` refills and draws under one lock.
            let (key, remaining) = match self.pool.acquire() {
                Acquired::Drawn { key, remaining, .. } => (key, remaining),
                Acquired::Unconfigured => return Err(ExhaustedFailure::NoCredentialsConfigured),
            };

            tracing::info!(
                attempt = attempts + 1,
                max_attempts,
                credential = %key.redacted(),
                remaining,
                model = self.backend.model(),
                "Attempting completion"
            );

            match self.backend.complete(&key, conversation).await {
                Ok(content) => {
                    tracing::info!(
                        attempt = attempts + 1,
                        credential = %key.redacted(),
                        "Completion succeeded"
                    );
                    return Ok(Completion {
                        content,
                        attempts: attempts + 1,
                    });
                }
                Err(failure) => {
                    self.pool.evict(&key);
                    attempts += 1;
                    tracing::warn!(
                        attempt = attempts,
                        credential = %key.redacted(),
                        kind = failure.kind(),
                        error = %failure,
                        remaining = self.pool.len_available(),
                        "Completion attempt failed, removed key from pool"
                    );
                    last_failure = Some(failure);

                    if attempts < max_attempts {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }

        tracing::error!(attempts, "All API keys failed for this request");
        Err(ExhaustedFailure::AllCredentialsFailed {
            attempts,
            last_failure,
        })
    }
}
