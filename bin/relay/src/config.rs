//! Centralized relay configuration.
//!
//! Loaded via the `config` crate from `RELAY_`-prefixed environment
//! variables, e.g. `RELAY_API_KEYS`, `RELAY_PLATFORM_TOKEN`, `RELAY_MAX_TURNS`.

use crate::error::StartupError;
use chat_relay_ai::{DEFAULT_BASE_URL, DEFAULT_MODEL, RetryPolicy};
use chat_relay_conversation::{DEFAULT_MAX_TURNS, bound_for_turns};
use chat_relay_core::Result;
use chat_relay_credential::{ApiKey, parse_key_list};
use rootcause::prelude::ResultExt;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// System prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Relay configuration.
#[derive(Clone, Deserialize)]
pub struct RelayConfig {
    /// Comma-separated completion API keys.
    #[serde(default)]
    pub api_keys: String,

    /// Bearer token the chat platform bridge must present.
    #[serde(default)]
    pub platform_token: Option<String>,

    /// Model requested from the completion endpoint.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// User/assistant exchanges kept per user, besides the system prompt.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Per-request timeout for the completion endpoint, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Pause after a failed completion attempt, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Pause after the key pool is refilled, in milliseconds.
    #[serde(default = "default_reset_delay_ms")]
    pub reset_delay_ms: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    60
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_reset_delay_ms() -> u64 {
    1000
}

impl RelayConfig {
    /// The environment source the relay reads from.
    #[must_use]
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix("RELAY")
            .prefix_separator("_")
            .separator("__")
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but cannot be parsed.
    pub fn from_env() -> std::result::Result<Self, config::ConfigError> {
        Self::load(Self::environment())
    }

    /// Loads configuration from the given environment source.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but cannot be parsed.
    pub fn load(source: config::Environment) -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Returns the platform token, rejecting a missing or blank one.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::MissingPlatformToken`].
    pub fn platform_token(&self) -> Result<&str, StartupError> {
        match self.platform_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(StartupError::MissingPlatformToken.into()),
        }
    }

    /// Parses the configured API keys.
    ///
    /// An empty list is not an error here; the relay starts and answers
    /// every chat with the no-keys reply.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::InvalidCredentials`] if an entry is malformed.
    pub fn credentials(&self) -> Result<Vec<ApiKey>, StartupError> {
        parse_key_list(&self.api_keys).context(StartupError::InvalidCredentials)
    }

    /// Returns the configured system prompt, or the default one.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        match self.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => prompt,
            _ => DEFAULT_SYSTEM_PROMPT,
        }
    }

    /// Maximum history length, system prompt included.
    #[must_use]
    pub fn history_bound(&self) -> usize {
        bound_for_turns(self.max_turns)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: None,
            backoff: Duration::from_millis(self.backoff_ms),
            reset_delay: Duration::from_millis(self.reset_delay_ms),
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Checks values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.max_turns == 0 {
            return Err(StartupError::InvalidMaxTurns {
                value: self.max_turns,
            }
            .into());
        }
        self.platform_token()?;
        Ok(())
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_count = self
            .api_keys
            .split(',')
            .filter(|k| !k.trim().is_empty())
            .count();
        f.debug_struct("RelayConfig")
            .field("api_keys", &format_args!("<{key_count} keys>"))
            .field(
                "platform_token",
                &self.platform_token.as_ref().map(|_| "<redacted>"),
            )
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("api_base_url", &self.api_base_url)
            .field("max_turns", &self.max_turns)
            .field("bind_addr", &self.bind_addr)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("backoff_ms", &self.backoff_ms)
            .field("reset_delay_ms", &self.reset_delay_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> RelayConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RelayConfig::load(RelayConfig::environment().source(Some(map)))
            .expect("config should load")
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_turns, 20);
        assert_eq!(config.history_bound(), 21);
        assert_eq!(config.system_prompt(), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.backoff, Duration::from_millis(500));
        assert_eq!(policy.reset_delay, Duration::from_secs(1));
    }

    #[test]
    fn reads_prefixed_variables() {
        let config = load(&[
            ("RELAY_API_KEYS", "sk-one, sk-two"),
            ("RELAY_PLATFORM_TOKEN", "bridge-secret"),
            ("RELAY_MAX_TURNS", "5"),
            ("RELAY_SYSTEM_PROMPT", "Be brief."),
            ("RELAY_BACKOFF_MS", "0"),
        ]);

        assert_eq!(config.history_bound(), 6);
        assert_eq!(config.system_prompt(), "Be brief.");
        assert_eq!(config.retry_policy().backoff, Duration::ZERO);
        assert_eq!(config.platform_token().expect("token"), "bridge-secret");

        let keys = config.credentials().expect("keys should parse");
        let exposed: Vec<&str> = keys.iter().map(ApiKey::expose).collect();
        assert_eq!(exposed, ["sk-one", "sk-two"]);
    }

    #[test]
    fn reads_numeric_looking_secrets_verbatim() {
        let config = load(&[
            ("RELAY_API_KEYS", "0042"),
            ("RELAY_PLATFORM_TOKEN", "00123"),
            ("RELAY_SYSTEM_PROMPT", "1e3"),
            ("RELAY_MAX_TURNS", "5"),
        ]);

        assert_eq!(config.api_keys, "0042");
        assert_eq!(config.platform_token().expect("token"), "00123");
        assert_eq!(config.system_prompt(), "1e3");
        assert_eq!(config.max_turns, 5);

        let keys = config.credentials().expect("keys should parse");
        assert_eq!(keys[0].expose(), "0042");
    }

    #[test]
    fn empty_key_list_is_allowed() {
        let config = load(&[("RELAY_API_KEYS", "")]);
        assert!(config.credentials().expect("empty list parses").is_empty());
    }

    #[test]
    fn validate_rejects_missing_token_and_zero_turns() {
        assert!(load(&[]).validate().is_err());
        assert!(load(&[("RELAY_PLATFORM_TOKEN", "   ")]).validate().is_err());
        assert!(
            load(&[("RELAY_PLATFORM_TOKEN", "t"), ("RELAY_MAX_TURNS", "0")])
                .validate()
                .is_err()
        );
        assert!(load(&[("RELAY_PLATFORM_TOKEN", "t")]).validate().is_ok());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load(&[
            ("RELAY_API_KEYS", "sk-secret-one,sk-secret-two"),
            ("RELAY_PLATFORM_TOKEN", "bridge-secret"),
        ]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("bridge-secret"));
        assert!(rendered.contains("<2 keys>"));
    }
}
