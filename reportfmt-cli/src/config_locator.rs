use anyhow::{bail, Result};
use reportfmt_core::FormatterConfig;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "reportfmt";
const CONFIG_FILE: &str = "config.yaml";

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    User(PathBuf),
    Default,
}

impl ConfigSource {
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::Explicit(path) => format!("Loaded config from: {}", path.display()),
            ConfigSource::User(path) => format!("Loaded user config from: {}", path.display()),
            ConfigSource::Default => "Using default config".to_string(),
        }
    }
}

/// `<config dir>/reportfmt/config.yaml`, e.g. `~/.config/reportfmt/config.yaml` on Linux.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Loads `-c <path>` when given, otherwise the user config if present,
/// otherwise the built-in defaults.
///
/// An explicit path that is missing or invalid is an error. A broken user
/// config only warns and falls back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<(FormatterConfig, ConfigSource)> {
    load_config_from(explicit, user_config_path().as_deref())
}

pub fn load_config_from(
    explicit: Option<&Path>,
    user: Option<&Path>,
) -> Result<(FormatterConfig, ConfigSource)> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("config file not found: {}", path.display());
        }
        let config = FormatterConfig::load_from_file(&path.to_string_lossy())?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    match user.filter(|path| path.is_file()) {
        Some(path) => {
            let text = path.to_string_lossy();
            match FormatterConfig::load_from_file(&text) {
                Ok(config) => Ok((config, ConfigSource::User(path.to_path_buf()))),
                Err(e) => {
                    log::warn!("Ignoring user config {text}: {e}");
                    Ok((FormatterConfig::default(), ConfigSource::Default))
                }
            }
        }
        None => Ok((FormatterConfig::default(), ConfigSource::Default)),
    }
}
