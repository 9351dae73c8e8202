// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("File watcher error: {0}")]
    NotifyError(#[from] notify::Error),

    /// The change source cannot continue (e.g. the watcher went away).
    #[error("Watch failure: {0}")]
    WatchError(String),

    #[error("path \"{}\" does not exist", .0.display())]
    PathNotFound(PathBuf),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Failed to launch '{target}': {source}")]
    LaunchError {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Reload callback failed: {0}")]
    CallbackError(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchrunError>;
