//! Shared result alias.
//!
//! Crates keep their own error enums and report them through rootcause, so
//! a fallible call in this workspace returns `Result<T, TheirError>`.

use rootcause::Report;

/// Result whose error is a rootcause report carrying context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
