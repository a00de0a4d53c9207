//! Configuration loading
//!
//! Configuration lives in `<config_dir>/config.toml`. The directory comes from
//! `--config-dir`, then `$TUNEDEX_CONFIG_DIR`, then the platform config
//! directory (`~/.config/tunedex` on Linux).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::library::LIBRARY_DB;

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "TUNEDEX_CONFIG_DIR";
pub const CONFIG_TOML: &str = "config.toml";

const DEFAULT_CONFIG: &str = r#"[library]
db_path = "library.db"  # Relative paths resolve against this directory
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    /// Directory the config was loaded from
    #[serde(skip)]
    pub config_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(LIBRARY_DB)
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Pick the config directory from the flag, the environment value, or the
/// platform default, in that order
pub fn resolve_config_dir(flag: Option<PathBuf>, env_value: Option<OsString>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }

    if let Some(dir) = env_value.filter(|value| !value.is_empty()) {
        log::debug!("Using config directory from ${}", CONFIG_DIR_ENV);
        return Ok(PathBuf::from(dir));
    }

    dirs::config_dir()
        .map(|dir| dir.join("tunedex"))
        .context("Unable to determine a config directory; set --config-dir or $TUNEDEX_CONFIG_DIR")
}

impl Config {
    /// Load `config.toml` from `config_dir`, writing the default file first if
    /// none exists
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_TOML);

        if !config_path.exists() {
            std::fs::create_dir_all(config_dir)
                .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;
            std::fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write {:?}", config_path))?;
            log::info!("Created default config at {:?}", config_path);
        }

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {:?}", config_path))?;
        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {:?}", config_path))?;

        config.config_dir = config_dir.to_path_buf();
        log::debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    /// Library database path, relative paths resolved against the config dir
    pub fn db_path(&self) -> PathBuf {
        if self.library.db_path.is_absolute() {
            self.library.db_path.clone()
        } else {
            self.config_dir.join(&self.library.db_path)
        }
    }
}
