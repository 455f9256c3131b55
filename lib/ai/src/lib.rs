//! Completion primitives for the chat-relay workspace.
//!
//! This crate provides:
//!
//! - **Completion backend**: One request to a completion endpoint with one key
//! - **OpenAI-compatible backend**: The HTTP binding used in production
//! - **Retry orchestrator**: Rotates through the credential pool until a
//!   request succeeds or the attempt budget runs out

pub mod backend;
pub mod error;
pub mod openai;
pub mod retry;

pub use backend::CompletionBackend;
pub use error::{BackendError, CompletionFailure, ExhaustedFailure};
pub use openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiCompatibleBackend};
pub use retry::{Completion, RetryOrchestrator, RetryPolicy};
