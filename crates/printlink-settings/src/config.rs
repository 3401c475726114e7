//! Configuration model and file I/O
//!
//! A configuration file is JSON or TOML, chosen by extension. Every section
//! falls back to defaults, so a file only needs the values it changes:
//!
//! ```toml
//! command_style = "with_line_and_checksum"
//!
//! [serial]
//! device = "/dev/ttyACM0"
//! baud_rate = 250000
//!
//! [engine]
//! online_timeout_secs = 20
//! ```

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use printlink_communication::{EngineConfig, SerialConfig};
use printlink_core::CommandStyle;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "printlink";
const CONFIG_FILE: &str = "config.toml";

/// File formats the configuration can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            Some(other) => Err(ConfigError::UnsupportedFormat(other.to_string())),
            None => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Complete printer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Framing applied to commands typed by the user
    pub command_style: CommandStyle,
    /// Serial link parameters
    pub serial: SerialConfig,
    /// Engine tuning
    pub engine: EngineConfig,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load config from file, or use defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)
                .map_err(|e| SettingsError::SaveError(e.to_string()))?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.serial.device.trim().is_empty() {
            return Err(SettingsError::invalid("serial.device", "must not be empty"));
        }

        if self.serial.baud_rate == 0 {
            return Err(SettingsError::invalid("serial.baud_rate", "must be > 0"));
        }

        if self.serial.read_timeout_ms == 0 {
            return Err(SettingsError::invalid("serial.read_timeout_ms", "must be > 0"));
        }

        let engine = &self.engine;
        let positive = [
            ("engine.queue_capacity", engine.queue_capacity as u64),
            ("engine.offline_timeout_secs", engine.offline_timeout_secs),
            ("engine.online_timeout_secs", engine.online_timeout_secs),
            ("engine.poll_interval_ms", engine.poll_interval_ms),
            ("engine.max_send_attempts", u64::from(engine.max_send_attempts)),
            ("engine.join_timeout_secs", engine.join_timeout_secs),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(SettingsError::invalid(key, "must be > 0"));
            }
        }

        Ok(())
    }
}

/// Default location of the configuration file
///
/// `<config dir>/printlink/config.toml`, where the config dir is the
/// platform's (e.g. `~/.config` on Linux).
pub fn default_config_path() -> SettingsResult<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        SettingsError::ConfigDirectory(
            ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string()).to_string(),
        )
    })?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}
