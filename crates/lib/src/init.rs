//! Initialize the configuration directory: create ~/.botin, default config, the attachments
//! directory, and the bundled resources.
//!
//! Layout mirrors `crates/lib/resources/` → `~/.botin/resources/`.

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::path::{Path, PathBuf};

use crate::config;

static BUNDLED_RESOURCES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/resources");

/// Ensure the configuration directory has been initialized (config file and resources directory exist).
pub fn require_initialized(config_path: &Path, config: &config::Config) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `botin init` first (config file not found: {})",
            config_path.display()
        );
    }
    let resources_dir = config::resolve_resources_dir(config, config_path);
    if !resources_dir.exists() {
        anyhow::bail!(
            "configuration not initialized; run `botin init` first (resources directory not found: {})",
            resources_dir.display()
        );
    }
    Ok(())
}

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing.
/// - Creates the attachments directory.
/// - Extracts bundled resources into the resources directory if it does not exist.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config::config_dir(config_path);
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let (config, _) = config::load_config(Some(config_path.to_path_buf()))?;

    let attachments = config::resolve_attachments_dir(&config, config_path);
    if !attachments.exists() {
        std::fs::create_dir_all(&attachments)
            .with_context(|| format!("creating attachments directory {}", attachments.display()))?;
        log::info!("created attachments directory at {}", attachments.display());
    }

    let resources_dir = config::resolve_resources_dir(&config, config_path);
    if !resources_dir.exists() {
        std::fs::create_dir_all(&resources_dir)
            .with_context(|| format!("creating resources directory {}", resources_dir.display()))?;
        if let Err(e) = BUNDLED_RESOURCES.extract(&resources_dir) {
            anyhow::bail!(
                "extracting bundled resources to {}: {}",
                resources_dir.display(),
                e
            );
        }
        log::info!("extracted bundled resources to {}", resources_dir.display());
    } else {
        log::debug!("resources directory already exists at {}, skipping", resources_dir.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("botin-init-{}-{}", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn init_creates_layout_and_extracts_greeting_image() {
        let dir = temp_dir("layout");
        let config_path = dir.join("config.json");
        init_config_dir(&config_path).unwrap();

        assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "{}");
        assert!(dir.join("attachments").is_dir());
        let extracted = std::fs::read(dir.join("resources").join(crate::menu::GREETING_IMAGE)).unwrap();
        let bundled = BUNDLED_RESOURCES
            .get_file(crate::menu::GREETING_IMAGE)
            .unwrap()
            .contents();
        assert_eq!(extracted, bundled);

        let (config, _) = config::load_config(Some(config_path.clone())).unwrap();
        require_initialized(&config_path, &config).unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn require_initialized_fails_without_config() {
        let dir = temp_dir("missing");
        let config_path = dir.join("config.json");
        let err = require_initialized(&config_path, &config::Config::default()).unwrap_err();
        assert!(err.to_string().contains("botin init"));
    }

    #[test]
    fn init_keeps_existing_config() {
        let dir = temp_dir("existing");
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("config.json");
        std::fs::write(&config_path, r#"{"bot":{"name":"Otro"}}"#).unwrap();
        init_config_dir(&config_path).unwrap();
        let (config, _) = config::load_config(Some(config_path)).unwrap();
        assert_eq!(config.bot.name, "Otro");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
