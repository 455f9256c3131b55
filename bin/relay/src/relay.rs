//! The relay service: one chat turn per inbound message.
//!
//! A turn locks the user's history, appends the message, asks the retry
//! orchestrator for a completion over the whole history and records the
//! reply. Failures produce an apology and leave no assistant entry behind.

use chat_relay_ai::{CompletionBackend, ExhaustedFailure, RetryOrchestrator};
use chat_relay_conversation::{HistoryStore, Message, bound_for_turns};
use chat_relay_core::{RequestId, UserId};

/// Reply when every attempt failed.
pub const EXHAUSTED_REPLY: &str = "Oops! All AI keys are used up, or the model could not respond \
                                   to your request. Please try again later.";

/// Reply when no API keys are configured at all.
pub const NO_KEYS_REPLY: &str =
    "Oops! No AI API keys are configured. Please contact the bot owner!";

/// Acknowledgement for a history reset.
pub const RESET_REPLY: &str = "Your memory has been cleared!";

/// Chat relay over a completion backend.
pub struct ChatRelay<B: CompletionBackend> {
    orchestrator: RetryOrchestrator<B>,
    histories: HistoryStore,
    system_prompt: String,
    history_bound: usize,
}

impl<B: CompletionBackend> ChatRelay<B> {
    /// Creates a relay keeping `max_turns` exchanges per user.
    pub fn new(
        orchestrator: RetryOrchestrator<B>,
        system_prompt: impl Into<String>,
        max_turns: usize,
    ) -> Self {
        Self {
            orchestrator,
            histories: HistoryStore::new(),
            system_prompt: system_prompt.into(),
            history_bound: bound_for_turns(max_turns),
        }
    }

    /// Returns the retry orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &RetryOrchestrator<B> {
        &self.orchestrator
    }

    /// Returns the per-user history store.
    #[must_use]
    pub fn histories(&self) -> &HistoryStore {
        &self.histories
    }

    /// Handles one chat message and returns the text to send back.
    ///
    /// Concurrent calls for the same user run one after another.
    #[tracing::instrument(
        skip(self, message),
        fields(user_id = %user_id, request_id = %RequestId::new())
    )]
    pub async fn chat(&self, user_id: &UserId, message: &str) -> String {
        let handle = self.histories.get_or_create(user_id, &self.system_prompt);
        let mut history = handle.lock().await;

        history.append(Message::user(message));
        history.trim(self.history_bound);

        match self.orchestrator.complete(history.entries()).await {
            Ok(completion) => {
                tracing::info!(
                    attempts = completion.attempts,
                    reply_len = completion.content.len(),
                    "Relayed completion"
                );
                history.append(Message::assistant(completion.content.clone()));
                history.trim(self.history_bound);
                completion.content
            }
            Err(ExhaustedFailure::NoCredentialsConfigured) => {
                tracing::error!("Chat received but no API keys are configured");
                NO_KEYS_REPLY.to_string()
            }
            Err(failure) => {
                tracing::error!(error = %failure, "Completion failed for chat");
                EXHAUSTED_REPLY.to_string()
            }
        }
    }

    /// Clears the user's history down to the system prompt.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn reset(&self, user_id: &UserId) -> &'static str {
        self.histories.reset(user_id, &self.system_prompt).await;
        RESET_REPLY
    }
}
