//! chat-relay gateway.
//!
//! This crate wires the credential pool, retry orchestrator and history
//! store into a relay service and exposes it over HTTP to a chat-platform
//! bridge.

pub mod config;
pub mod error;
pub mod relay;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;
