//! Configuration management
//!
//! Settings live in `settings.json` in the wallet directory:
//! ```json
//! {
//!   "app": { "demoMode": false },
//!   "security": { "autoLockMinutes": 5, "maxPinAttempts": 5, "biometricStepUp": false, "defaultPinLength": 6 },
//!   "remote": { "baseUrl": "https://id.example.com/api/v1", "timeoutSecs": 30 }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::attempts::DEFAULT_MAX_ATTEMPTS;
use crate::domain::PinLength;

/// Environment variable forcing demo mode on or off
pub const DEMO_MODE_ENV: &str = "IDWALLET_DEMO_MODE";

/// Environment variable overriding the remote base URL
pub const REMOTE_URL_ENV: &str = "IDWALLET_REMOTE_URL";

const DEFAULT_AUTO_LOCK_MINUTES: u32 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    security: SecuritySettings,
    #[serde(default)]
    remote: RemoteSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Security settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    #[serde(default = "default_auto_lock_minutes")]
    pub auto_lock_minutes: u32,
    #[serde(default = "default_max_pin_attempts")]
    pub max_pin_attempts: u32,
    #[serde(default)]
    pub biometric_step_up: bool,
    #[serde(default)]
    pub default_pin_length: PinLength,
}

fn default_auto_lock_minutes() -> u32 {
    DEFAULT_AUTO_LOCK_MINUTES
}

fn default_max_pin_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            auto_lock_minutes: DEFAULT_AUTO_LOCK_MINUTES,
            max_pin_attempts: DEFAULT_MAX_ATTEMPTS,
            biometric_step_up: false,
            default_pin_length: PinLength::default(),
        }
    }
}

/// Remote identity service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Wallet configuration (simplified view of settings)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub demo_mode: bool,
    pub security: SecuritySettings,
    pub remote: RemoteSettings,
}

impl Config {
    /// Load config from the wallet directory
    ///
    /// Demo mode can be enabled via:
    /// 1. Settings file (idw demo on)
    /// 2. Environment variable IDWALLET_DEMO_MODE (for CI/testing)
    ///
    /// IDWALLET_REMOTE_URL replaces `remote.baseUrl`.
    pub fn load(wallet_dir: &Path) -> Result<Self> {
        let raw = read_settings(wallet_dir)?;

        let demo_mode = match std::env::var(DEMO_MODE_ENV).ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        let mut remote = raw.remote;
        if let Ok(url) = std::env::var(REMOTE_URL_ENV) {
            if !url.trim().is_empty() {
                remote.base_url = Some(url);
            }
        }

        Ok(Self {
            demo_mode,
            security: raw.security,
            remote,
        })
    }

    /// Save config to the wallet directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, wallet_dir: &Path) -> Result<()> {
        let mut settings = read_settings(wallet_dir)?;

        settings.app.demo_mode = self.demo_mode;
        settings.security = self.security.clone();
        settings.remote = self.remote.clone();

        std::fs::create_dir_all(wallet_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(wallet_dir.join("settings.json"), content)?;
        Ok(())
    }

    /// Enable demo mode
    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    /// Disable demo mode
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

fn read_settings(wallet_dir: &Path) -> Result<SettingsFile> {
    let settings_path = wallet_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
