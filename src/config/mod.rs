//! Configuration file model, defaults, and validation.

#[expect(clippy::module_inception, reason = "Config type lives in config.rs")]
mod config;

pub use config::{Config, DEFAULT_CONFIG_TOML};
