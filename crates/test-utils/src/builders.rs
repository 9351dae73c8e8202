#![allow(dead_code)]

use std::path::PathBuf;

use watchrun::config::{ConfigFile, RawConfigFile};
use watchrun::types::FilterMode;

/// Builder for `ConfigFile` to simplify test setup.
#[derive(Debug, Default)]
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.run.debounce_ms = ms;
        self
    }

    pub fn step_ms(mut self, ms: u64) -> Self {
        self.config.run.step_ms = ms;
        self
    }

    pub fn sigint_timeout_ms(mut self, ms: u64) -> Self {
        self.config.run.sigint_timeout_ms = ms;
        self
    }

    pub fn keep_watching(mut self) -> Self {
        self.config.run.exit_on_child_exit = false;
        self
    }

    pub fn filter_mode(mut self, mode: FilterMode) -> Self {
        self.config.filter.mode = mode;
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        self.config.filter.extensions.push(ext.to_string());
        self
    }

    pub fn ignore_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.filter.ignore_paths.push(path.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.env.insert(key.to_string(), value.to_string());
        self
    }

    /// The raw config, before validation.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
