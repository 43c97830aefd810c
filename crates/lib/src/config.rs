//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.botin/config.json`). Storage paths are
//! resolved against the config file's directory so a whole setup can be moved as one folder.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Bot identity used in replies.
    #[serde(default)]
    pub bot: BotConfig,

    /// Where attachments are written and bundled resources are read from.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP and WebSocket (default 3978).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3978
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Name the bot introduces itself with when someone joins (default "BotinEjemplo").
    #[serde(default = "default_bot_name")]
    pub name: String,
}

fn default_bot_name() -> String {
    "BotinEjemplo".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
        }
    }
}

/// Storage directories. Relative paths are resolved against the config file's parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Directory downloaded attachments are written to (default `attachments`).
    #[serde(default)]
    pub attachments_dir: Option<PathBuf>,

    /// Directory holding bundled images for inline replies (default `resources`).
    #[serde(default)]
    pub resources_dir: Option<PathBuf>,
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("BOTIN_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".botin").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or BOTIN_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Directory that holds the config file.
pub fn config_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn resolve_storage_path(configured: Option<&PathBuf>, config_path: &Path, default: &str) -> PathBuf {
    let base = config_dir(config_path);
    match configured {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.clone()
            } else {
                base.join(d)
            }
        }
        _ => base.join(default),
    }
}

/// Resolve where downloaded attachments go.
pub fn resolve_attachments_dir(config: &Config, config_path: &Path) -> PathBuf {
    resolve_storage_path(
        config.storage.attachments_dir.as_ref(),
        config_path,
        "attachments",
    )
}

/// Resolve where bundled resources (e.g. the greeting image) are read from.
pub fn resolve_resources_dir(config: &Config, config_path: &Path) -> PathBuf {
    resolve_storage_path(
        config.storage.resources_dir.as_ref(),
        config_path,
        "resources",
    )
}
