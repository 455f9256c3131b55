//! Core domain types and utilities for the chat-relay workspace.
//!
//! This crate provides the foundational identifier types and the error
//! handling alias shared by the credential, conversation and AI crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, RequestId, UserId};
