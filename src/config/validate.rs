// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchrunError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WatchrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.run, raw.filter, raw.env))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_timing(cfg)?;
    validate_filter(cfg)?;
    validate_env(cfg)?;
    Ok(())
}

fn validate_timing(cfg: &RawConfigFile) -> Result<()> {
    let run = &cfg.run;

    if run.step_ms == 0 {
        return Err(WatchrunError::ConfigError(
            "[run].step_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if run.step_ms >= run.debounce_ms {
        return Err(WatchrunError::ConfigError(format!(
            "[run].step_ms ({}) must be smaller than [run].debounce_ms ({})",
            run.step_ms, run.debounce_ms
        )));
    }

    if run.timeout_ms == Some(0) {
        return Err(WatchrunError::ConfigError(
            "[run].timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    for (key, value) in [
        ("sigint_timeout_ms", run.sigint_timeout_ms),
        ("sigkill_timeout_ms", run.sigkill_timeout_ms),
        ("poll_interval_ms", run.poll_interval_ms),
    ] {
        if value == 0 {
            return Err(WatchrunError::ConfigError(format!(
                "[run].{key} must be >= 1 (got 0)"
            )));
        }
    }

    Ok(())
}

fn validate_filter(cfg: &RawConfigFile) -> Result<()> {
    // An empty list means the built-in python extensions.
    if let Some(bad) = cfg
        .filter
        .extensions
        .iter()
        .find(|e| e.trim().trim_start_matches('.').is_empty())
    {
        return Err(WatchrunError::ConfigError(format!(
            "[filter].extensions has an empty entry '{bad}'"
        )));
    }
    Ok(())
}

fn validate_env(cfg: &RawConfigFile) -> Result<()> {
    for key in cfg.env.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(WatchrunError::ConfigError(format!(
                "[env] has an invalid variable name '{key}'"
            )));
        }
        if key == crate::exec::CHANGES_ENV_VAR {
            return Err(WatchrunError::ConfigError(format!(
                "[env] cannot set {key}; it is managed by watchrun"
            )));
        }
    }
    Ok(())
}
