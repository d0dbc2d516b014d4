//! Configuration types, defaults, loading, and validation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::onboarding::DEFAULT_CODE_PATTERN;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Onboarding wizard behaviour
    #[serde(default)]
    pub onboarding: OnboardingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log to file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Onboarding wizard configuration: poll cadence, collaborator timeouts,
/// and the clipboard automation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingConfig {
    /// Clipboard poll interval while waiting for an auth code (default: 400ms)
    #[serde(default = "default_clipboard_poll_ms")]
    pub clipboard_poll_ms: u64,

    /// Peer discovery poll interval on the connection page (default: 1000ms)
    #[serde(default = "default_peer_poll_ms")]
    pub peer_poll_ms: u64,

    /// Permission re-read interval on the permissions page (default: 1000ms)
    #[serde(default = "default_permission_poll_ms")]
    pub permission_poll_ms: u64,

    /// Upper bound for a single discovery query (default: 2000ms)
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    /// Upper bound for a single permission status read (default: 1000ms)
    #[serde(default = "default_permission_timeout_ms")]
    pub permission_timeout_ms: u64,

    /// Upper bound for the authorization code exchange (default: 30000ms)
    #[serde(default = "default_exchange_timeout_ms")]
    pub exchange_timeout_ms: u64,

    /// Watch the clipboard for an authorization code (default: true)
    #[serde(default = "default_true")]
    pub auto_detect_clipboard: bool,

    /// Exchange a detected code without asking for confirmation (default: true)
    #[serde(default = "default_true")]
    pub auto_connect_clipboard: bool,

    /// Regex an authorization code must match (whole trimmed clipboard text)
    #[serde(default = "default_code_pattern")]
    pub code_pattern: String,
}

fn default_clipboard_poll_ms() -> u64 {
    400
}

fn default_peer_poll_ms() -> u64 {
    1000
}

fn default_permission_poll_ms() -> u64 {
    1000
}

fn default_discovery_timeout_ms() -> u64 {
    2000
}

fn default_permission_timeout_ms() -> u64 {
    1000
}

fn default_exchange_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_code_pattern() -> String {
    DEFAULT_CODE_PATTERN.to_string()
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            clipboard_poll_ms: default_clipboard_poll_ms(),
            peer_poll_ms: default_peer_poll_ms(),
            permission_poll_ms: default_permission_poll_ms(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            permission_timeout_ms: default_permission_timeout_ms(),
            exchange_timeout_ms: default_exchange_timeout_ms(),
            auto_detect_clipboard: true,
            auto_connect_clipboard: true,
            code_pattern: default_code_pattern(),
        }
    }
}

impl OnboardingConfig {
    pub fn clipboard_poll(&self) -> Duration {
        Duration::from_millis(self.clipboard_poll_ms)
    }

    pub fn peer_poll(&self) -> Duration {
        Duration::from_millis(self.peer_poll_ms)
    }

    pub fn permission_poll(&self) -> Duration {
        Duration::from_millis(self.permission_poll_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn permission_timeout(&self) -> Duration {
        Duration::from_millis(self.permission_timeout_ms)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }
}

/// Canonical base directory: `~/.setupflow/`
///
/// Config, onboarding state and log files live here.
pub fn setupflow_home() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let p = home.join(".setupflow");
    if !p.exists() {
        let _ = std::fs::create_dir_all(&p);
    }
    p
}

/// Expand a leading `~` (TOML doesn't)
fn expand_tilde(p: &Path) -> PathBuf {
    if let Ok(rest) = p.strip_prefix("~") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        p.to_path_buf()
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.setupflow/config.toml
    /// 3. Local config: ./setupflow.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            config = Self::merge_from_file(config, &system_config_path)?;
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::merge_from_file(config, &local_config_path)?;
        }

        config = Self::apply_env_overrides(config)?;
        config.logging.file = config.logging.file.as_deref().map(expand_tilde);

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file path
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. Custom config file (specified path)
    /// 3. Environment variables
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        let mut config = Self::default();

        if path.exists() {
            config = Self::merge_from_file(config, path)?;
        } else {
            anyhow::bail!("Config file not found: {:?}", path);
        }

        config = Self::apply_env_overrides(config)?;
        config.logging.file = config.logging.file.as_deref().map(expand_tilde);

        tracing::debug!("Configuration loaded successfully from custom path");
        Ok(config)
    }

    /// Get the system config path: ~/.setupflow/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        Some(setupflow_home().join("config.toml"))
    }

    /// Get the local config path: ./setupflow.toml
    fn local_config_path() -> PathBuf {
        PathBuf::from("./setupflow.toml")
    }

    /// Load and merge configuration from a TOML file
    fn merge_from_file(base: Self, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let file_config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(Self::merge(base, file_config))
    }

    /// Merge two configs (file_config overwrites base where specified)
    fn merge(_base: Self, overlay: Self) -> Self {
        // Sections are replaced whole; serde defaults fill missing fields
        Self {
            logging: overlay.logging,
            onboarding: overlay.onboarding,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: Self) -> Result<Self> {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    fn apply_overrides(mut config: Self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(log_level) = var("SETUPFLOW_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Some(log_file) = var("SETUPFLOW_LOG_FILE") {
            config.logging.file = Some(PathBuf::from(log_file));
        }

        if let Some(detect) = var("SETUPFLOW_AUTO_DETECT_CLIPBOARD") {
            override_flag(
                &mut config.onboarding.auto_detect_clipboard,
                "SETUPFLOW_AUTO_DETECT_CLIPBOARD",
                &detect,
            );
        }

        if let Some(connect) = var("SETUPFLOW_AUTO_CONNECT_CLIPBOARD") {
            override_flag(
                &mut config.onboarding.auto_connect_clipboard,
                "SETUPFLOW_AUTO_CONNECT_CLIPBOARD",
                &connect,
            );
        }

        if let Some(pattern) = var("SETUPFLOW_CODE_PATTERN") {
            config.onboarding.code_pattern = pattern;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        let onboarding = &self.onboarding;
        let intervals = [
            ("clipboard_poll_ms", onboarding.clipboard_poll_ms),
            ("peer_poll_ms", onboarding.peer_poll_ms),
            ("permission_poll_ms", onboarding.permission_poll_ms),
            ("discovery_timeout_ms", onboarding.discovery_timeout_ms),
            ("permission_timeout_ms", onboarding.permission_timeout_ms),
            ("exchange_timeout_ms", onboarding.exchange_timeout_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                anyhow::bail!("onboarding.{} must be greater than zero", name);
            }
        }

        regex::Regex::new(&onboarding.code_pattern).with_context(|| {
            format!(
                "Invalid onboarding.code_pattern: {:?}",
                onboarding.code_pattern
            )
        })?;

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}

/// Boolean from an env var value: `1/true/yes/on` or `0/false/no/off`,
/// case-insensitive.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Unrecognized values keep the current setting.
fn override_flag(flag: &mut bool, key: &str, value: &str) {
    match parse_flag(value) {
        Some(parsed) => *flag = parsed,
        None => tracing::warn!(
            "Ignoring {}={:?}: expected true/false, keeping {}",
            key,
            value,
            flag
        ),
    }
}
