// src/config/model.rs

//! Configuration file model (`Watchrun.toml`).
//!
//! ```toml
//! [run]
//! debounce_ms = 1600
//! step_ms = 50
//! sigint_timeout_ms = 5000
//! sigkill_timeout_ms = 1000
//! exit_on_child_exit = true
//! force_polling = false
//! log_level = "info"
//!
//! [filter]
//! mode = "extensions"
//! extensions = ["py"]
//! ignore_paths = ["build"]
//!
//! [env]
//! APP_ENV = "dev"
//! ```
//!
//! Every section and key is optional. [`RawConfigFile`] is what `serde`
//! produces; [`ConfigFile`] is only obtainable through validation
//! (`ConfigFile::try_from(raw)`).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::SupervisorOptions;
use crate::exec::TerminationPolicy;
use crate::types::FilterMode;
use crate::watch::DebounceSettings;

/// `[run]`: timing and lifecycle knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub debounce_ms: u64,
    pub step_ms: u64,
    /// How long to wait for changes before re-checking the child. Defaults
    /// to `debounce_ms`.
    pub timeout_ms: Option<u64>,
    pub sigint_timeout_ms: u64,
    pub sigkill_timeout_ms: u64,
    pub exit_on_child_exit: bool,
    pub force_polling: bool,
    pub poll_interval_ms: u64,
    pub log_level: Option<String>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            debounce_ms: 1_600,
            step_ms: 50,
            timeout_ms: None,
            sigint_timeout_ms: 5_000,
            sigkill_timeout_ms: 1_000,
            exit_on_child_exit: true,
            force_polling: false,
            poll_interval_ms: 300,
            log_level: None,
        }
    }
}

/// `[filter]`: which changes trigger a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSection {
    pub mode: FilterMode,
    pub extensions: Vec<String>,
    pub ignore_paths: Vec<PathBuf>,
}

/// Unvalidated configuration, as deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfigFile {
    pub run: RunSection,
    pub filter: FilterSection,
    /// Extra environment entries for every child.
    pub env: BTreeMap<String, String>,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub run: RunSection,
    pub filter: FilterSection,
    pub env: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Used by validation once the raw config has been checked.
    pub(crate) fn new_unchecked(
        run: RunSection,
        filter: FilterSection,
        env: BTreeMap<String, String>,
    ) -> Self {
        Self { run, filter, env }
    }

    pub fn debounce_settings(&self) -> DebounceSettings {
        DebounceSettings {
            debounce: Duration::from_millis(self.run.debounce_ms),
            step: Duration::from_millis(self.run.step_ms),
        }
    }

    pub fn termination_policy(&self) -> TerminationPolicy {
        TerminationPolicy {
            sigint_timeout: Duration::from_millis(self.run.sigint_timeout_ms),
            sigkill_timeout: Duration::from_millis(self.run.sigkill_timeout_ms),
        }
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            debounce: self.debounce_settings(),
            timeout: self.run.timeout_ms.map(Duration::from_millis),
            termination: self.termination_policy(),
            exit_on_child_exit: self.run.exit_on_child_exit,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.run.poll_interval_ms)
    }
}
