//! PrintLink Settings Crate
//!
//! Loads, validates and saves the serial link and engine configuration.

pub mod config;
pub mod error;

pub use config::{default_config_path, Config};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
