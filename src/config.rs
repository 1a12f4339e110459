//! Top-level application configuration.
//!
//! Configuration is stored in `.ticketdesk/config.yaml` and includes:
//! - The hosted backend endpoint and its anon API key
//! - Change-sync tuning (poll interval, notification coalescing window)
//! - The HTTP request timeout

use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DeskError, Result};
use crate::paths::desk_root;

pub const URL_ENV: &str = "TICKETDESK_URL";
pub const API_KEY_ENV: &str = "TICKETDESK_API_KEY";

/// Keys accepted by `config get` / `config set`
pub const CONFIG_KEYS: &[&str] = &[
    "service.url",
    "service.api_key",
    "sync.poll_interval_ms",
    "sync.coalesce_ms",
    "remote_timeout",
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend connection
    #[serde(default)]
    pub service: ServiceConfig,

    /// Change notification tuning
    #[serde(default, skip_serializing_if = "SyncConfig::is_default")]
    pub sync: SyncConfig,

    /// Remote operation timeout in seconds (default: 30)
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout: u64,
}

fn default_remote_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            sync: SyncConfig::default(),
            remote_timeout: default_remote_timeout(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How often the hosted client polls each watched table (default: 2000)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Window for collapsing bursts of change notifications (default: 150)
    #[serde(default = "default_coalesce_ms")]
    pub coalesce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_coalesce_ms() -> u64 {
    150
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            coalesce_ms: default_coalesce_ms(),
        }
    }
}

impl SyncConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would spin the poller
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        desk_root().join("config.yaml")
    }

    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            DeskError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                DeskError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory for config at {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(&path, content).map_err(|e| {
            DeskError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;

        // Owner read/write only: the file holds the API key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions).map_err(|e| {
                DeskError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to set permissions on config at {}: {}", path.display(), e),
                ))
            })?;
        }

        Ok(())
    }

    /// Backend URL from the environment or config file, without a trailing slash
    pub fn service_url(&self) -> Option<String> {
        if let Ok(url) = env::var(URL_ENV)
            && !url.is_empty()
        {
            return Some(url.trim_end_matches('/').to_string());
        }
        self.service
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| u.trim_end_matches('/').to_string())
    }

    /// Anon API key from the environment or config file
    pub fn api_key(&self) -> Option<String> {
        if let Ok(key) = env::var(API_KEY_ENV)
            && !key.is_empty()
        {
            return Some(key);
        }
        self.service.api_key.clone().filter(|k| !k.is_empty())
    }

    /// Both pieces needed to reach the hosted backend
    pub fn require_service(&self) -> Result<(String, String)> {
        let url = self.service_url().ok_or_else(|| {
            DeskError::Config(format!(
                "service.url is not set. Run: ticketdesk config set service.url <url> (or set {URL_ENV})"
            ))
        })?;
        let key = self.api_key().ok_or_else(|| {
            DeskError::Config(format!(
                "service.api_key is not set. Run: ticketdesk config set service.api_key <key> (or set {API_KEY_ENV})"
            ))
        })?;
        Ok((url, key))
    }

    /// Get the remote operation timeout duration
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout)
    }

    /// Read a value by dotted key. Secrets come back masked.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "service.url" => self.service.url.clone(),
            "service.api_key" => self.service.api_key.as_deref().map(mask_sensitive_value),
            "sync.poll_interval_ms" => Some(self.sync.poll_interval_ms.to_string()),
            "sync.coalesce_ms" => Some(self.sync.coalesce_ms.to_string()),
            "remote_timeout" => Some(self.remote_timeout.to_string()),
            other => return Err(unknown_key(other)),
        };
        Ok(value)
    }

    /// Set a value by dotted key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "service.url" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| DeskError::Config(format!("invalid service.url '{value}': {e}")))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(DeskError::Config(format!(
                        "service.url must be http or https, got '{}'",
                        parsed.scheme()
                    )));
                }
                self.service.url = Some(value.trim_end_matches('/').to_string());
            }
            "service.api_key" => {
                if value.is_empty() {
                    return Err(DeskError::Config("service.api_key cannot be empty".to_string()));
                }
                self.service.api_key = Some(value.to_string());
            }
            "sync.poll_interval_ms" => self.sync.poll_interval_ms = parse_number(key, value)?,
            "sync.coalesce_ms" => self.sync.coalesce_ms = parse_number(key, value)?,
            "remote_timeout" => self.remote_timeout = parse_number(key, value)?,
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> DeskError {
    DeskError::Config(format!(
        "unknown config key '{}'. Valid keys: {}",
        key,
        CONFIG_KEYS.join(", ")
    ))
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| DeskError::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}

/// Mask a secret so only its first and last two characters remain visible
pub fn mask_sensitive_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.service.url.is_none());
        assert_eq!(config.sync.poll_interval_ms, 2000);
        assert_eq!(config.sync.coalesce_ms, 150);
        assert_eq!(config.remote_timeout, 30);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
service:
  url: https://desk.example.com
sync:
  coalesce_ms: 0
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.service.url.as_deref(), Some("https://desk.example.com"));
        assert_eq!(config.sync.coalesce_ms, 0);
        assert_eq!(config.sync.poll_interval_ms, 2000);
        assert_eq!(config.remote_timeout, 30);
    }

    #[test]
    fn test_default_sync_is_not_serialized() {
        let yaml = serde_yaml_ng::to_string(&Config::default()).unwrap();
        assert!(!yaml.contains("sync"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = Config::default();
        config.service.api_key = Some("anon-key-abcdef123456".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("anon-key-abcdef123456"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_get_masks_api_key() {
        let mut config = Config::default();
        config.set("service.api_key", "anon-key-abcdef123456").unwrap();
        assert_eq!(
            config.get("service.api_key").unwrap().as_deref(),
            Some("an...56")
        );
    }

    #[test]
    fn test_set_validates_values() {
        let mut config = Config::default();
        assert!(config.set("service.url", "not a url").is_err());
        assert!(config.set("service.url", "ftp://desk.example.com").is_err());
        assert!(config.set("sync.coalesce_ms", "-5").is_err());
        assert!(config.set("nope", "1").is_err());

        config.set("service.url", "https://desk.example.com/").unwrap();
        assert_eq!(config.service.url.as_deref(), Some("https://desk.example.com"));
        config.set("remote_timeout", "5").unwrap();
        assert_eq!(config.remote_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_poll_interval_has_floor() {
        let sync = SyncConfig {
            poll_interval_ms: 0,
            coalesce_ms: 0,
        };
        assert_eq!(sync.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_mask_short_values() {
        assert_eq!(mask_sensitive_value("abc"), "****");
        assert_eq!(mask_sensitive_value("abcdefghij"), "ab...ij");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_values() {
        let mut config = Config::default();
        config.service.url = Some("https://file.example.com".to_string());
        config.service.api_key = Some("file-key".to_string());

        // SAFETY: We use #[serial] to ensure single-threaded access
        unsafe {
            std::env::set_var(URL_ENV, "https://env.example.com/");
            std::env::set_var(API_KEY_ENV, "env-key");
        }
        assert_eq!(config.service_url().as_deref(), Some("https://env.example.com"));
        assert_eq!(config.api_key().as_deref(), Some("env-key"));

        unsafe {
            std::env::remove_var(URL_ENV);
            std::env::remove_var(API_KEY_ENV);
        }
        assert_eq!(config.service_url().as_deref(), Some("https://file.example.com"));
        assert_eq!(config.api_key().as_deref(), Some("file-key"));
    }

    #[test]
    #[serial]
    fn test_require_service_reports_missing_key() {
        unsafe {
            std::env::remove_var(URL_ENV);
            std::env::remove_var(API_KEY_ENV);
        }
        let mut config = Config::default();
        config.service.url = Some("https://desk.example.com".to_string());
        let err = config.require_service().unwrap_err();
        assert!(err.to_string().contains("service.api_key"));
    }

    #[test]
    #[serial]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join(".ticketdesk");
        unsafe { std::env::set_var("TICKETDESK_ROOT", &root) };

        let mut config = Config::default();
        config.set("service.url", "https://desk.example.com").unwrap();
        config.set("sync.poll_interval_ms", "500").unwrap();
        config.save().unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(root.join("config.yaml")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let loaded = Config::load().unwrap();
        assert_eq!(loaded.service.url.as_deref(), Some("https://desk.example.com"));
        assert_eq!(loaded.sync.poll_interval_ms, 500);

        unsafe { std::env::remove_var("TICKETDESK_ROOT") };
    }
}
