//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/aiwarden/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/aiwarden/` (~/.config/aiwarden/)
//! - Data: `$XDG_DATA_HOME/aiwarden/` (~/.local/share/aiwarden/)
//! - State/Logs: `$XDG_STATE_HOME/aiwarden/` (~/.local/state/aiwarden/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Session log watcher configuration
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Runtime gateway link configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Notification webhook configuration
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session log watcher configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WatcherConfig {
    /// Root directory containing per-agent session logs
    /// (default: ~/.openclaw/agents)
    pub agents_dir: Option<PathBuf>,

    /// Seconds between discovery scans for new session logs
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Debounce window for filesystem change notifications
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum characters kept from tool-result content
    #[serde(default = "default_preview_chars")]
    pub content_preview_chars: usize,

    /// Capacity of the watcher's event channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            agents_dir: None,
            poll_interval_secs: default_poll_interval(),
            debounce_ms: default_debounce_ms(),
            content_preview_chars: default_preview_chars(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl WatcherConfig {
    /// Returns the agents root, falling back to `~/.openclaw/agents`
    pub fn agents_dir(&self) -> PathBuf {
        self.agents_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(".openclaw").join("agents"))
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(Error::Config(
                "watcher.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.content_preview_chars == 0 {
            return Err(Error::Config(
                "watcher.content_preview_chars must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config(
                "watcher.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_poll_interval() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_preview_chars() -> usize {
    2000
}

fn default_channel_capacity() -> usize {
    256
}

/// Runtime gateway link configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GatewayConfig {
    /// Gateway endpoint of the monitored runtime (optional; the monitor
    /// runs on log tailing alone when unset)
    pub url: Option<String>,

    /// Seconds between reconnect attempts after the link drops
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

fn default_reconnect_secs() -> u64 {
    5
}

/// Notification webhook configuration
///
/// When enabled, aiwarden pushes activity records, alerts, and status
/// updates to a webhook endpoint in addition to storing them locally.
#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    /// Enable/disable webhook notifications
    #[serde(default)]
    pub enabled: bool,

    /// Webhook endpoint URL
    pub webhook_url: Option<String>,

    /// Bearer token sent with each request (optional)
    pub token: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_notifier_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient failures
    #[serde(default = "default_notifier_max_retries")]
    pub max_retries: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            token: None,
            timeout_secs: default_notifier_timeout(),
            max_retries: default_notifier_max_retries(),
        }
    }
}

impl NotifierConfig {
    /// Check if the notifier is properly configured and enabled
    pub fn is_ready(&self) -> bool {
        self.enabled && self.webhook_url.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.webhook_url.is_none() {
            return Err(Error::Config(
                "notifier.webhook_url is required when notifier is enabled".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "notifier.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_notifier_timeout() -> u64 {
    10
}

fn default_notifier_max_retries() -> usize {
    3
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.watcher.validate()?;
        self.notifier.validate()?;
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/aiwarden/config.toml` (~/.config/aiwarden/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("aiwarden").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/aiwarden/` (~/.local/share/aiwarden/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("aiwarden")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/aiwarden/` (~/.local/state/aiwarden/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("aiwarden")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/aiwarden/monitor.db` (~/.local/share/aiwarden/monitor.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("monitor.db")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.watcher.poll_interval_secs, 30);
        assert_eq!(config.watcher.content_preview_chars, 2000);
        assert!(!config.notifier.enabled);
        assert!(config.gateway.url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[watcher]
agents_dir = "/tmp/agents"
poll_interval_secs = 10

[gateway]
url = "ws://127.0.0.1:18789"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.watcher.agents_dir(), PathBuf::from("/tmp/agents"));
        assert_eq!(config.watcher.poll_interval_secs, 10);
        assert_eq!(config.gateway.url.as_deref(), Some("ws://127.0.0.1:18789"));
        assert_eq!(config.gateway.reconnect_secs, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_watcher_validation() {
        let config = WatcherConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = WatcherConfig {
            content_preview_chars: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_notifier_config_validation() {
        // Disabled config is always valid
        let config = NotifierConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_ready());

        // Enabled without a URL should fail
        let config = NotifierConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // Enabled with a URL should pass
        let config = NotifierConfig {
            enabled: true,
            webhook_url: Some("https://hooks.example.com/aiwarden".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.is_ready());
    }

    #[test]
    fn test_parse_notifier_config() {
        let toml = r#"
[notifier]
enabled = true
webhook_url = "https://hooks.example.com/aiwarden"
token = "wh_xxxxxxxxxxxx"
timeout_secs = 5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.notifier.enabled);
        assert_eq!(
            config.notifier.webhook_url.as_deref(),
            Some("https://hooks.example.com/aiwarden")
        );
        assert_eq!(config.notifier.timeout_secs, 5);
        assert_eq!(config.notifier.max_retries, 3);
        assert!(config.notifier.is_ready());
    }
}
