//! Conversation history for the chat-relay workspace.
//!
//! This crate provides:
//!
//! - **Messages**: Role-tagged entries in the shape completion endpoints expect
//! - **History**: A bounded log whose first entry is always the system prompt
//! - **History store**: Per-user histories, each behind its own lock

pub mod history;
pub mod message;

pub use history::{DEFAULT_MAX_TURNS, History, HistoryHandle, HistoryStore, bound_for_turns};
pub use message::{Message, MessageRole};
