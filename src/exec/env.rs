// src/exec/env.rs

//! Serialization of the triggering changes for the child's environment.

use anyhow::Context;

use crate::errors::Result;
use crate::types::ChangeBatch;

/// Environment variable carrying the changes that caused the current launch.
pub const CHANGES_ENV_VAR: &str = "WATCHFILES_CHANGES";

/// JSON value for [`CHANGES_ENV_VAR`]: `[["added","a.py"],["deleted","b.py"]]`
/// in batch order. The initial launch (`None`) gets `[]`.
pub fn changes_env_value(changes: Option<&ChangeBatch>) -> Result<String> {
    let pairs: Vec<(&str, String)> = changes
        .map(|batch| {
            batch
                .iter()
                .map(|c| (c.kind.as_str(), c.path.to_string_lossy().into_owned()))
                .collect()
        })
        .unwrap_or_default();

    let json = serde_json::to_string(&pairs).context("serializing changes for the child environment")?;
    Ok(json)
}
