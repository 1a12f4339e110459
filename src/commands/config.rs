//! Configuration commands: `config show`, `config get` and `config set`

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::config::{API_KEY_ENV, CONFIG_KEYS, Config, URL_ENV, mask_sensitive_value};
use crate::error::Result;

/// Show current configuration
pub fn cmd_config_show(output_json: bool) -> Result<()> {
    let config = Config::load()?;

    let url = config.service_url();
    let api_key = config.api_key();

    let json_output = json!({
        "service": {
            "url": url,
            "api_key_configured": api_key.is_some(),
        },
        "sync": {
            "poll_interval_ms": config.sync.poll_interval_ms,
            "coalesce_ms": config.sync.coalesce_ms,
        },
        "remote_timeout": config.remote_timeout,
        "config_file": Config::config_path().to_string_lossy(),
    });

    let not_configured = || "not configured".dimmed().to_string();
    let mut text = String::new();
    text.push_str(&format!("{}\n\n", "Configuration:".cyan().bold()));

    text.push_str(&format!("{}:\n", "service".cyan()));
    text.push_str(&format!(
        "  url: {}\n",
        url.unwrap_or_else(not_configured)
    ));
    text.push_str(&format!(
        "  api_key: {}\n",
        api_key
            .as_deref()
            .map(mask_sensitive_value)
            .unwrap_or_else(not_configured)
    ));
    text.push('\n');

    text.push_str(&format!("{}:\n", "sync".cyan()));
    text.push_str(&format!("  poll_interval_ms: {}\n", config.sync.poll_interval_ms));
    text.push_str(&format!("  coalesce_ms: {}\n", config.sync.coalesce_ms));
    text.push('\n');

    text.push_str(&format!("{}: {}s\n", "remote_timeout".cyan(), config.remote_timeout));
    text.push('\n');
    text.push_str(&format!(
        "{}",
        format!(
            "Environment overrides: {URL_ENV}, {API_KEY_ENV}\nConfig file: {}",
            Config::config_path().display()
        )
        .dimmed()
    ));

    CommandOutput::new(json_output)
        .with_text(text)
        .print(output_json)
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str, output_json: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    // Never echo the secret back
    let shown = config.get(key)?.unwrap_or_default();
    CommandOutput::new(json!({
        "action": "config_set",
        "key": key,
        "value": shown,
        "success": true,
    }))
    .with_text(format!("Set {} to {}", key.cyan(), shown))
    .print(output_json)
}

/// Get a configuration value
pub fn cmd_config_get(key: &str, output_json: bool) -> Result<()> {
    let config = Config::load()?;
    let value = config.get(key)?;

    let text = match &value {
        Some(v) => v.clone(),
        None => format!(
            "{} is not set (valid keys: {})",
            key,
            CONFIG_KEYS.join(", ")
        )
        .dimmed()
        .to_string(),
    };
    CommandOutput::new(json!({
        "key": key,
        "value": value,
    }))
    .with_text(text)
    .print(output_json)
}
