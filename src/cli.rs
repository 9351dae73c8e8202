// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Flags left unset fall back to the config file, then to built-in defaults.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::model::RawConfigFile;
use crate::types::FilterMode;

/// Command-line arguments for `watchrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchrun",
    version,
    about = "Run a command and restart it whenever watched files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Command to run. Executed through the shell unless `--no-shell` is given.
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Files or directories to watch.
    #[arg(value_name = "PATHS", default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Extra arguments appended to the target.
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Watchrun.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHRUN_LOG`, the config file or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Which changes trigger a restart.
    #[arg(long, value_enum, value_name = "MODE")]
    pub filter: Option<FilterMode>,

    /// Paths to ignore, comma separated (default and extensions filters).
    #[arg(long, value_name = "PATHS", value_delimiter = ',')]
    pub ignore_paths: Option<Vec<PathBuf>>,

    /// Extensions to watch, comma separated (extensions filter).
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Debounce window in milliseconds.
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Poll step in milliseconds.
    #[arg(long, value_name = "MS")]
    pub step: Option<u64>,

    /// How long to wait after SIGINT before killing, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub sigint_timeout: Option<u64>,

    /// How long to wait after SIGKILL before blocking on the exit, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub sigkill_timeout: Option<u64>,

    /// Run the target directly instead of through the shell.
    #[arg(long)]
    pub no_shell: bool,

    /// Keep watching when the process exits on its own.
    #[arg(long)]
    pub keep_watching: bool,

    /// Poll the filesystem instead of using native notifications.
    #[arg(long)]
    pub force_polling: bool,

    /// Resolve config and target, print them, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Overlay the flags that were given on top of the file config.
    pub fn apply_overrides(&self, raw: &mut RawConfigFile) {
        if let Some(mode) = self.filter {
            raw.filter.mode = mode;
        }
        if let Some(paths) = &self.ignore_paths {
            raw.filter.ignore_paths = paths.clone();
        }
        if let Some(exts) = &self.extensions {
            raw.filter.extensions = exts.clone();
        }
        if let Some(ms) = self.debounce {
            raw.run.debounce_ms = ms;
        }
        if let Some(ms) = self.step {
            raw.run.step_ms = ms;
        }
        if let Some(ms) = self.sigint_timeout {
            raw.run.sigint_timeout_ms = ms;
        }
        if let Some(ms) = self.sigkill_timeout {
            raw.run.sigkill_timeout_ms = ms;
        }
        if self.keep_watching {
            raw.run.exit_on_child_exit = false;
        }
        if self.force_polling {
            raw.run.force_polling = true;
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_default_to_cwd() {
        let args = CliArgs::try_parse_from(["watchrun", "python app.py"]).unwrap();
        assert_eq!(args.paths, vec![PathBuf::from(".")]);
        assert!(args.args.is_empty());
    }

    #[test]
    fn trailing_args_and_lists() {
        let args = CliArgs::try_parse_from([
            "watchrun",
            "--filter",
            "extensions",
            "--extensions",
            "py,pyi",
            "server",
            "src",
            "tests",
            "--",
            "--port",
            "8000",
        ])
        .unwrap();
        assert_eq!(args.target, "server");
        assert_eq!(args.paths, vec![PathBuf::from("src"), PathBuf::from("tests")]);
        assert_eq!(args.args, vec!["--port".to_string(), "8000".to_string()]);
        assert_eq!(args.filter, Some(FilterMode::Extensions));
        assert_eq!(
            args.extensions,
            Some(vec!["py".to_string(), "pyi".to_string()])
        );
    }

    #[test]
    fn overrides_only_touch_given_flags() {
        let args = CliArgs::try_parse_from([
            "watchrun",
            "--debounce",
            "500",
            "--keep-watching",
            "cmd",
        ])
        .unwrap();
        let mut raw = RawConfigFile::default();
        raw.run.step_ms = 10;
        args.apply_overrides(&mut raw);
        assert_eq!(raw.run.debounce_ms, 500);
        assert_eq!(raw.run.step_ms, 10);
        assert!(!raw.run.exit_on_child_exit);
        assert_eq!(raw.run.sigint_timeout_ms, 5_000);
    }
}
