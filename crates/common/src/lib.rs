//! Shared error plumbing and text helpers used across all chattext crates.

pub mod error;
pub mod text;

pub use error::{Error, FromMessage, Result};
