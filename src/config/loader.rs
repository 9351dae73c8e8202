// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchrunError};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** check timing or
/// filter settings. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Watchrun.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Watchrun.toml")
}

/// Resolve the raw config the CLI should start from.
///
/// - An explicit path must exist.
/// - Otherwise the default path is read if present.
/// - Otherwise built-in defaults are used.
///
/// CLI overrides are applied to the result before validation.
pub fn load_for_cli(explicit: Option<&Path>) -> Result<RawConfigFile> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(WatchrunError::PathNotFound(path.to_path_buf()));
            }
            load_from_path(path)
        }
        None => {
            let path = default_config_path();
            if path.is_file() {
                debug!(path = %path.display(), "using default config file");
                load_from_path(&path)
            } else {
                Ok(RawConfigFile::default())
            }
        }
    }
}
