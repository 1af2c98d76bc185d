//! Configuration file location
//!
//! Linux: `~/.config/discourse-smoke/config.toml`
//! macOS: `~/Library/Application Support/discourse-smoke/config.toml`
//! Windows: `%APPDATA%\discourse-smoke\config.toml`

use std::path::PathBuf;

/// Application name used for platform directories
const APP_NAME: &str = "discourse-smoke";

/// Environment variable that points at an explicit config file
pub const CONFIG_ENV: &str = "SMOKE_CONFIG";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the default configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Config file named by `SMOKE_CONFIG`, if set
pub fn explicit_config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
