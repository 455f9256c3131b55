//! Credential handling for the chat-relay workspace.
//!
//! This crate provides:
//!
//! - **API keys**: Redacting wrapper around completion endpoint credentials
//! - **Credential pool**: The configured key set and the subset still usable
//! - **Random source**: Pluggable selection so tests can be deterministic

pub mod credential;
pub mod error;
pub mod pool;
pub mod random;

pub use credential::{ApiKey, parse_key_list};
pub use error::CredentialError;
pub use pool::{Acquired, CredentialPool};
pub use random::{RandomSource, ThreadRandom};
