//! Test doubles shared by the relay and gateway tests.

use crate::relay::ChatRelay;
use async_trait::async_trait;
use chat_relay_ai::{CompletionBackend, CompletionFailure, RetryOrchestrator, RetryPolicy};
use chat_relay_conversation::Message;
use chat_relay_credential::{ApiKey, CredentialPool, RandomSource};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Always picks the first available key.
pub(crate) struct FirstKey;

impl RandomSource for FirstKey {
    fn index(&self, _len: usize) -> usize {
        0
    }
}

/// Backend that fails for a fixed set of keys and otherwise echoes the
/// last message, recording every conversation it was sent.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    failing: HashSet<String>,
    delay: Duration,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub(crate) fn failing(keys: &[&str]) -> Self {
        Self {
            failing: keys.iter().map(|k| (*k).to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(
        &self,
        credential: &ApiKey,
        conversation: &[Message],
    ) -> Result<String, CompletionFailure> {
        self.seen.lock().expect("lock").push(conversation.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(credential.expose()) {
            return Err(CompletionFailure::Unauthorized { status: 401 });
        }
        let last = conversation.last().map_or("", |m| m.content.as_str());
        Ok(format!("echo: {last}"))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub(crate) fn keys(raw: &[&str]) -> Vec<ApiKey> {
    raw.iter()
        .map(|k| k.parse().expect("valid key"))
        .collect()
}

/// Builds a relay over the scripted backend with no retry pauses.
pub(crate) fn relay(
    raw_keys: &[&str],
    backend: ScriptedBackend,
    max_turns: usize,
) -> ChatRelay<ScriptedBackend> {
    let pool = Arc::new(CredentialPool::with_random_source(keys(raw_keys), FirstKey));
    let orchestrator = RetryOrchestrator::new(pool, backend, RetryPolicy::immediate());
    ChatRelay::new(orchestrator, "You are a test assistant.", max_turns)
}
