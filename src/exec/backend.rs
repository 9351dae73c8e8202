// src/exec/backend.rs

//! Pluggable launcher abstraction.
//!
//! The supervisor talks to a [`Launcher`] instead of spawning processes
//! itself. Production uses [`CommandLauncher`]; tests provide a fake launcher
//! whose children record signals instead of receiving them.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use tracing::{debug, info};

use crate::errors::{Result, WatchrunError};
use crate::exec::child::{ChildProcess, OsChild};
use crate::exec::env::{changes_env_value, CHANGES_ENV_VAR};
use crate::exec::target::Target;
use crate::types::ChangeBatch;

/// Starts one run of the target.
pub trait Launcher {
    type Child: ChildProcess + 'static;

    /// Start a fresh child. `changes` is `None` for the initial launch.
    fn launch(&mut self, changes: Option<&ChangeBatch>) -> Result<Self::Child>;

    /// Human readable description of what gets launched, for logs.
    fn describe(&self) -> String;
}

/// Real launcher spawning OS processes.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    target: Target,
    env: BTreeMap<String, String>,
    current_dir: Option<PathBuf>,
}

impl CommandLauncher {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            env: BTreeMap::new(),
            current_dir: None,
        }
    }

    /// Extra environment entries for every child.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl Launcher for CommandLauncher {
    type Child = OsChild;

    fn launch(&mut self, changes: Option<&ChangeBatch>) -> Result<OsChild> {
        let changes_json = changes_env_value(changes)?;

        let mut cmd = self.target.command();
        cmd.envs(&self.env)
            .env(CHANGES_ENV_VAR, &changes_json)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        // Own process group, so stopping the child also reaches anything it
        // started (e.g. the commands of a shell line).
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|source| WatchrunError::LaunchError {
            target: self.target.to_string(),
            source,
        })?;

        info!(pid = child.id(), command = %self.target, "started process");
        debug!(pid = child.id(), changes = %changes_json, "child environment");

        Ok(OsChild::group_leader(child))
    }

    fn describe(&self) -> String {
        self.target.to_string()
    }
}
