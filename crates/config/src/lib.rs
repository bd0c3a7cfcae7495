//! Configuration loading, env substitution, and validation.
//!
//! Config files: `chattext.toml`, `chattext.yaml`, or `chattext.json`
//! Searched in `./` then `~/.config/chattext/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, load_config, load_or_discover},
    schema::{ChatTextConfig, DeliverySection, DumpSection, TwitchConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
