//! Warden process configuration.
//!
//! Loaded from `~/.warden/config.toml`; every field has a default so a missing
//! file still yields a runnable config (except the bot token, which the binary
//! checks at startup).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, WardenError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Telegram bot token. Empty means "take it from WARDEN_BOT_TOKEN".
    #[serde(default)]
    pub bot_token: String,
    /// Shared secret for the admin HTTP surface.
    #[serde(default = "default_admin_token")]
    pub admin_token: String,
    /// Admin HTTP listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Directory holding locally uploaded media files.
    #[serde(default = "default_media_dir")]
    pub media_dir: String,
    /// Reconciliation sweep period in seconds.
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,
}

fn default_admin_token() -> String {
    "changeme".into()
}
fn default_port() -> u16 {
    8080
}
fn default_db_path() -> String {
    "~/.warden/warden.db".into()
}
fn default_media_dir() -> String {
    "~/.warden/media".into()
}
fn default_sweep_secs() -> u64 {
    60
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_token: default_admin_token(),
            port: default_port(),
            db_path: default_db_path(),
            media_dir: default_media_dir(),
            sweep_interval_secs: default_sweep_secs(),
        }
    }
}

impl WardenConfig {
    /// Load config from the default path, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() { Self::load_from(&path) } else { Ok(Self::default()) }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WardenError::Config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| WardenError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path (~/.warden/config.toml).
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Warden home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".warden")
    }

    /// Database path with `~` expanded.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).to_string())
    }

    /// Media directory with `~` expanded.
    pub fn media_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.media_dir).to_string())
    }
}
