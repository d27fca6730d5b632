//! Defaults for image-shift
//!
//! Operators who always target the same region or cluster can keep them in a
//! small YAML file instead of repeating the flags:
//!
//! ```yaml
//! region: eu-west-1
//! cluster: production
//! ```
//!
//! Values given on the command line or through the environment always win.

pub mod error;

pub use error::*;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable pointing straight at a config file
pub const CONFIG_PATH_ENV: &str = "IMAGE_SHIFT_CONFIG";

const LOCAL_CONFIG_FILE: &str = ".image-shift.yaml";
const GLOBAL_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub region: Option<String>,
    pub cluster: Option<String>,
}

impl Defaults {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `<config_dir>/image-shift`, e.g. `~/.config/image-shift` on Linux
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("image-shift"))
}

/// Locate the defaults file
///
/// Search order:
/// 1. `IMAGE_SHIFT_CONFIG` (must exist when set)
/// 2. `./.image-shift.yaml`
/// 3. `<config_dir>/image-shift/config.yaml`
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if !path.exists() {
            return Err(ConfigError::ConfigFileNotFound(path));
        }
        return Ok(Some(path));
    }

    let local = std::env::current_dir()?.join(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Ok(Some(local));
    }

    if let Some(config_dir) = get_config_dir() {
        let global = config_dir.join(GLOBAL_CONFIG_FILE);
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

/// Load defaults, empty when no file exists
pub fn load_defaults() -> Result<Defaults> {
    match find_config_file()? {
        Some(path) => Defaults::from_path(&path),
        None => Ok(Defaults::default()),
    }
}
