// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::engine::{RunOutcome, ShutdownFlag, Supervisor};
use crate::errors::{Result, WatchrunError};
use crate::exec::{CommandLauncher, Target};
use crate::types::ChangeBatch;
use crate::watch::{build_filter, NotifySource, SourceOptions};

/// Everything resolved from the CLI and config before anything is started.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub config: ConfigFile,
    pub target: Target,
    pub paths: Vec<PathBuf>,
    pub ignore_paths: Vec<PathBuf>,
}

impl RunPlan {
    /// Merge CLI flags into the raw config, validate it, and resolve the
    /// watched paths and the target.
    pub fn resolve(args: &CliArgs, mut raw: RawConfigFile) -> Result<Self> {
        args.apply_overrides(&mut raw);
        let config = ConfigFile::try_from(raw)?;

        let paths = args
            .paths
            .iter()
            .map(|p| canonical_path(p))
            .collect::<Result<Vec<_>>>()?;

        let cwd = std::env::current_dir()?;
        let ignore_paths = config
            .filter
            .ignore_paths
            .iter()
            .map(|p| resolve_ignore_path(&cwd, p))
            .collect();

        let target = Target::from_command_line(&args.target, &args.args, !args.no_shell)?;
        target.resolve()?;

        Ok(Self {
            config,
            target,
            paths,
            ignore_paths,
        })
    }
}

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code: the child's own code when it exited by
/// itself, 0 after Ctrl-C.
pub async fn run(args: CliArgs, raw: RawConfigFile) -> Result<i32> {
    let plan = RunPlan::resolve(&args, raw)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(0);
    }

    let filter = build_filter(
        plan.config.filter.mode,
        &plan.config.filter.extensions,
        plan.ignore_paths.clone(),
    )?;
    let source_options = SourceOptions {
        force_polling: plan.config.run.force_polling,
        poll_interval: plan.config.poll_interval(),
    };
    let source = NotifySource::new(&plan.paths, filter, source_options)?;
    let launcher = CommandLauncher::new(plan.target.clone()).with_env(plan.config.env.clone());

    // Ctrl-C → stop at the next step boundary.
    let shutdown = ShutdownFlag::new();
    {
        let flag = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            flag.trigger();
        });
    }

    info!(paths = ?plan.paths, command = %plan.target, "watching for changes");

    let mut supervisor = Supervisor::new(source, launcher, plan.config.supervisor_options())
        .with_shutdown(shutdown);
    let outcome = supervisor
        .run_async(|batch: ChangeBatch| async move {
            debug!(changes = batch.len(), "reload callback");
            Ok::<(), anyhow::Error>(())
        })
        .await?;

    Ok(exit_code(outcome))
}

/// Map a supervision outcome to the exit code of `watchrun` itself.
pub fn exit_code(outcome: RunOutcome) -> i32 {
    match outcome {
        RunOutcome::ChildExited { exit_code, .. } => exit_code.unwrap_or(1),
        RunOutcome::Interrupted { .. } => 0,
    }
}

fn canonical_path(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .map_err(|_| WatchrunError::PathNotFound(path.to_path_buf()))
}

/// Make an ignore path comparable with the (canonical) event paths.
///
/// Existing paths are canonicalized; others are made absolute against `base`
/// and have `.` and `..` removed lexically.
fn resolve_ignore_path(base: &Path, path: &Path) -> PathBuf {
    let joined = base.join(path);
    joined
        .canonicalize()
        .unwrap_or_else(|_| normalize_lexically(&joined))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}


fn print_dry_run(plan: &RunPlan) {
    let run = &plan.config.run;
    let filter = &plan.config.filter;

    println!("watchrun dry-run");
    println!("  target = {}", plan.target);
    println!("  paths:");
    for path in &plan.paths {
        println!("    - {}", path.display());
    }
    println!();

    println!("run:");
    println!("  debounce_ms = {}", run.debounce_ms);
    println!("  step_ms = {}", run.step_ms);
    println!(
        "  timeout_ms = {}",
        plan.config.supervisor_options().liveness_timeout().as_millis()
    );
    println!("  sigint_timeout_ms = {}", run.sigint_timeout_ms);
    println!("  sigkill_timeout_ms = {}", run.sigkill_timeout_ms);
    println!("  exit_on_child_exit = {}", run.exit_on_child_exit);
    println!("  force_polling = {}", run.force_polling);
    println!();

    println!("filter:");
    println!("  mode = {:?}", filter.mode);
    if !filter.extensions.is_empty() {
        println!("  extensions = {:?}", filter.extensions);
    }
    for path in &plan.ignore_paths {
        println!("  ignore: {}", path.display());
    }

    if !plan.config.env.is_empty() {
        println!();
        println!("env:");
        for (key, value) in &plan.config.env {
            println!("  {key} = {value}");
        }
    }

    debug!("dry-run complete (no execution)");
}
