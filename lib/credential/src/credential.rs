//! API key wrapper for completion endpoint credentials.
//!
//! Keys are never printed in full. `Debug` and the [`ApiKey::redacted`]
//! display only show the first few characters, which is enough for an
//! operator to tell keys apart in logs.

use crate::error::CredentialError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Number of leading characters shown when a key is logged.
const VISIBLE_PREFIX_CHARS: usize = 8;

/// A single API key for the completion endpoint.
///
/// Cloning is cheap; the key text is shared.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    /// Returns the full key for use in an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns a display adapter that shows only the key prefix.
    #[must_use]
    pub fn redacted(&self) -> Redacted<'_> {
        Redacted(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.redacted())
    }
}

impl FromStr for ApiKey {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CredentialError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(CredentialError::InvalidFormat {
                position: 0,
                reason: "contains whitespace".to_string(),
            });
        }
        Ok(Self(Arc::from(trimmed)))
    }
}

/// Prefix-only view of an [`ApiKey`].
pub struct Redacted<'a>(&'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(VISIBLE_PREFIX_CHARS).collect();
        write!(f, "{prefix}...")
    }
}

/// Parses a comma-delimited list of keys as found in configuration.
///
/// Entries are trimmed and blank entries are skipped. Repeated keys are kept
/// once, in first-seen order, so eviction of a key is never undone by a
/// second copy of it.
///
/// # Errors
///
/// Returns an error if an entry contains embedded whitespace.
pub fn parse_key_list(raw: &str) -> chat_relay_core::Result<Vec<ApiKey>, CredentialError> {
    let mut keys: Vec<ApiKey> = Vec::new();

    for (position, entry) in raw.split(',').enumerate() {
        let key = match entry.parse::<ApiKey>() {
            Ok(key) => key,
            Err(CredentialError::Empty) => continue,
            Err(CredentialError::InvalidFormat { reason, .. }) => {
                return Err(CredentialError::InvalidFormat { position, reason }.into());
            }
        };

        if keys.contains(&key) {
            tracing::warn!(position, "Ignoring duplicate credential");
            continue;
        }
        keys.push(key);
    }

    Ok(keys)
}
