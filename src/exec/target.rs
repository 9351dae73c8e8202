// src/exec/target.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::{Result, WatchrunError};

/// What the supervised child runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A command line handed to the platform shell (`sh -c` / `cmd /C`).
    Shell(String),
    /// A program executed directly with an argument vector.
    Exec { program: String, args: Vec<String> },
}

impl Target {
    /// Build a target from the CLI form.
    ///
    /// Extra arguments are appended to the command line (shell), quoted so
    /// each stays a single word, or to the argument vector (exec). Without a
    /// shell the command line is split with POSIX shell word rules.
    pub fn from_command_line(line: &str, extra_args: &[String], use_shell: bool) -> Result<Self> {
        if use_shell {
            let mut cmd = line.trim().to_string();
            for arg in extra_args {
                cmd.push(' ');
                cmd.push_str(&shell_words::quote(arg));
            }
            Ok(Target::Shell(cmd))
        } else {
            let words = shell_words::split(line).map_err(|err| {
                WatchrunError::ConfigError(format!("invalid command line '{line}': {err}"))
            })?;
            let mut parts = words.into_iter();
            let program = parts.next().unwrap_or_default();
            let args = parts.chain(extra_args.iter().cloned()).collect();
            Ok(Target::Exec { program, args })
        }
    }

    /// Check the target can be started, before any watching begins.
    pub fn resolve(&self) -> Result<()> {
        match self {
            Target::Shell(cmd) if cmd.trim().is_empty() => {
                Err(WatchrunError::TargetNotFound("empty command".to_string()))
            }
            Target::Shell(_) => Ok(()),
            Target::Exec { program, .. } => find_program(program)
                .map(|_| ())
                .ok_or_else(|| WatchrunError::TargetNotFound(program.clone())),
        }
    }

    pub(crate) fn command(&self) -> Command {
        match self {
            Target::Shell(cmd) => {
                if cfg!(windows) {
                    let mut c = Command::new("cmd");
                    c.arg("/C").arg(cmd);
                    c
                } else {
                    let mut c = Command::new("sh");
                    c.arg("-c").arg(cmd);
                    c
                }
            }
            Target::Exec { program, args } => {
                let mut c = Command::new(program);
                c.args(args);
                c
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Shell(cmd) => f.write_str(cmd),
            Target::Exec { program, args } => {
                f.write_str(&shell_words::quote(program))?;
                for arg in args {
                    write!(f, " {}", shell_words::quote(arg))?;
                }
                Ok(())
            }
        }
    }
}

/// Locate `program` either as a path or on `PATH`.
fn find_program(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        return as_path.is_file().then(|| as_path.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
