//! Bounded per-user conversation history.
//!
//! A history always starts with the system prompt. User and assistant
//! entries are appended after it and the oldest non-system entry is dropped
//! whenever the history grows past its bound.
//!
//! Histories live in memory only and are lost when the process exits.

use crate::message::{Message, MessageRole};
use chat_relay_core::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Default number of user/assistant entries retained after the system prompt.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Smallest bound `trim` honours: the system prompt plus the newest entry.
const MIN_BOUND: usize = 2;

/// Returns the history length bound for a number of retained entries.
#[must_use]
pub const fn bound_for_turns(max_turns: usize) -> usize {
    max_turns + 1
}

/// A single user's conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<Message>,
}

impl History {
    /// Creates a history holding only the system prompt.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            entries: vec![Message::system(system_prompt)],
        }
    }

    /// Adds an entry to the end.
    pub fn append(&mut self, message: Message) {
        self.entries.push(message);
    }

    /// Removes the oldest non-system entries until the length is within `bound`.
    ///
    /// The bound is never taken below two, so the system prompt and the most
    /// recently appended entry always survive. Returns the number of entries
    /// removed.
    pub fn trim(&mut self, bound: usize) -> usize {
        let bound = bound.max(MIN_BOUND);
        let mut removed = 0;
        while self.entries.len() > bound {
            self.entries.remove(1);
            removed += 1;
        }
        removed
    }

    /// Replaces the conversation with a fresh one holding only the system prompt.
    pub fn reset(&mut self, system_prompt: impl Into<String>) {
        self.entries = vec![Message::system(system_prompt)];
    }

    /// Returns every entry, system prompt first.
    #[must_use]
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    /// Returns the number of entries, including the system prompt.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a history holds at least its system prompt.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the system prompt.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.entries[0].content
    }

    /// Returns the last entry.
    #[must_use]
    pub fn last(&self) -> &Message {
        // Never empty: index 0 is the system prompt.
        &self.entries[self.entries.len() - 1]
    }

    /// Returns the number of entries with the given role.
    #[must_use]
    pub fn count_role(&self, role: MessageRole) -> usize {
        self.entries.iter().filter(|m| m.role == role).count()
    }
}

/// Shared handle to one user's history.
///
/// The async mutex is held for a whole relay turn, which serializes
/// concurrent requests from the same user.
pub type HistoryHandle = Arc<tokio::sync::Mutex<History>>;

/// All users' histories.
#[derive(Debug, Default)]
pub struct HistoryStore {
    histories: Mutex<HashMap<UserId, HistoryHandle>>,
}

impl HistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the user's history, creating one seeded with `system_prompt`
    /// if the user has none yet.
    #[must_use]
    pub fn get_or_create(&self, user_id: &UserId, system_prompt: &str) -> HistoryHandle {
        let mut histories = self
            .histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = histories.get(user_id) {
            return Arc::clone(handle);
        }

        tracing::debug!(user_id = %user_id, "Creating conversation history");
        let handle = Arc::new(tokio::sync::Mutex::new(History::new(system_prompt)));
        histories.insert(user_id.clone(), Arc::clone(&handle));
        handle
    }

    /// Replaces the user's history with one holding only `system_prompt`.
    ///
    /// Waits for any turn in progress for this user to finish first.
    pub async fn reset(&self, user_id: &UserId, system_prompt: &str) {
        let handle = self.get_or_create(user_id, system_prompt);
        handle.lock().await.reset(system_prompt);
        tracing::info!(user_id = %user_id, "Conversation history reset");
    }

    /// Returns the number of users with a history.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
