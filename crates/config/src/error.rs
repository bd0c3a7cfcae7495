//! Errors raised while pulling required values out of a loaded config.

pub use chattext_common::{Error, Result};

chattext_common::impl_context!();
