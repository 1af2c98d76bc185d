//! Configuration file and environment handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::{config_path, explicit_config_path};
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Browser settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Browser settings
#[derive(Debug, Deserialize)]
pub struct BrowserConfig {
    /// Chrome/Chromium binary; detected on the system when unset
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Run without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Window width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Window height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Extra command-line arguments for the browser
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: default_headless(),
            width: default_width(),
            height: default_height(),
            args: default_browser_args(),
        }
    }
}

fn default_headless() -> bool {
    true
}
fn default_width() -> u32 {
    1366
}
fn default_height() -> u32 {
    768
}
fn default_browser_args() -> Vec<String> {
    vec!["--disable-local-storage".to_string()]
}

/// Wait settings used by the browser session
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// How long a wait for an element or predicate may take
    #[serde(default = "default_wait")]
    pub wait_secs: u64,

    /// Delay between polls while waiting
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            wait_secs: default_wait(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_wait() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    100
}

impl Timeouts {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Config {
    /// Load configuration from `SMOKE_CONFIG` or the default config file
    pub fn load() -> Result<Self> {
        Self::load_from(explicit_config_path(), config_path())
    }

    /// Load configuration, preferring an explicitly named file
    ///
    /// An explicit file must exist. The default file is optional and its
    /// absence yields the default configuration.
    pub fn load_from(explicit: Option<PathBuf>, default: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(&path);
        }
        match default {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

/// Login used by the authenticated part of the scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Flags read from the process environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Skip every step that logs in or creates content
    pub readonly: bool,
    pub credentials: Credentials,
}

impl Environment {
    pub const READONLY: &'static str = "READONLY_TESTS";
    pub const USERNAME: &'static str = "DISCOURSE_USERNAME";
    pub const PASSWORD: &'static str = "DISCOURSE_PASSWORD";

    const DEFAULT_USERNAME: &'static str = "smoke_user";
    const DEFAULT_PASSWORD: &'static str = "P4ssw0rd";

    /// Read flags from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read flags through an arbitrary lookup
    ///
    /// Any non-empty value of `READONLY_TESTS` (including "0") turns read-only
    /// mode on. Empty credentials fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            readonly: non_empty(Self::READONLY).is_some(),
            credentials: Credentials {
                username: non_empty(Self::USERNAME)
                    .unwrap_or_else(|| Self::DEFAULT_USERNAME.to_string()),
                password: non_empty(Self::PASSWORD)
                    .unwrap_or_else(|| Self::DEFAULT_PASSWORD.to_string()),
            },
        }
    }
}
