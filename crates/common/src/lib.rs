//! Shared error definitions and path helpers used across all marketplace crates.

pub mod error;
pub mod paths;

pub use error::{Error, FromMessage, IoPathExt, Result};
