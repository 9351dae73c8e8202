// tests/process_termination.rs
//
// Real child processes; unix only since they rely on SIGINT semantics.
#![cfg(unix)]

mod common;
use crate::common::fakes::{added, deleted};
use crate::common::init_tracing;

use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};

use watchrun::exec::{
    ChildProcess, CommandLauncher, Launcher, RunState, SupervisedProcess, Target,
    TerminationPolicy,
};
use watchrun::types::ChangeBatch;

type TestResult = Result<(), Box<dyn Error>>;

/// Poll `path` until it holds a pid.
fn read_pid(path: &Path) -> Result<i32, Box<dyn Error>> {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if let Ok(text) = std::fs::read_to_string(path) {
            if let Ok(pid) = text.trim().parse() {
                return Ok(pid);
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    Err(format!("no pid written to {}", path.display()).into())
}

fn is_gone(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if kill(Pid::from_raw(pid), None).is_err() {
        return true;
    }
    // A killed orphan may linger as a zombie until init reaps it.
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .map(|stat| {
            stat.rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z'))
        })
        .unwrap_or(false)
}

fn wait_gone(pid: i32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if is_gone(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

fn policy(sigint_ms: u64) -> TerminationPolicy {
    TerminationPolicy {
        sigint_timeout: Duration::from_millis(sigint_ms),
        sigkill_timeout: Duration::from_millis(500),
    }
}

#[test]
fn interrupt_stops_a_cooperative_child() -> TestResult {
    init_tracing();

    let mut launcher = CommandLauncher::new(Target::Exec {
        program: "sleep".to_string(),
        args: vec!["30".to_string()],
    });
    let mut process = SupervisedProcess::new(launcher.launch(None)?);
    assert!(process.is_alive());

    let started = Instant::now();
    let report = policy(2_000).terminate(process);

    assert_eq!(report.signals_sent, 1);
    assert!(!report.already_exited);
    assert_eq!(report.final_state, RunState::Reaped);
    // Killed by a signal: no exit code.
    assert_eq!(report.exit.and_then(|e| e.code), None);
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}

#[test]
fn ignored_interrupt_escalates_to_kill() -> TestResult {
    init_tracing();

    let mut launcher = CommandLauncher::new(Target::Shell("trap '' INT; sleep 5".to_string()));
    let child = launcher.launch(None)?;
    // Give the shell a moment to install the trap.
    std::thread::sleep(Duration::from_millis(100));

    let report = policy(200).terminate(SupervisedProcess::new(child));

    assert_eq!(report.signals_sent, 2);
    assert_eq!(report.final_state, RunState::Reaped);
    assert!(report.exit.is_some());
    Ok(())
}

#[test]
fn stopping_a_shell_also_stops_its_children() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let pidfile = dir.path().join("grandchild.pid");
    let script = format!("sleep 30 & echo $! > '{}'; wait", pidfile.display());

    let mut launcher = CommandLauncher::new(Target::Shell(script));
    let child = launcher.launch(None)?;
    let grandchild = read_pid(&pidfile)?;

    let report = policy(300).terminate(SupervisedProcess::new(child));

    assert_eq!(report.final_state, RunState::Reaped);
    assert!(report.signals_sent >= 1);
    assert!(wait_gone(grandchild), "grandchild {grandchild} survived termination");
    Ok(())
}

#[test]
fn background_jobs_of_an_exited_shell_are_cleaned_up() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let pidfile = dir.path().join("job.pid");
    let script = format!("sleep 30 & echo $! > '{}'", pidfile.display());

    let mut launcher = CommandLauncher::new(Target::Shell(script));
    let mut child = launcher.launch(None)?;
    let job = read_pid(&pidfile)?;
    assert_eq!(child.wait()?.code, Some(0));

    let report = policy(300).terminate(SupervisedProcess::new(child));

    assert!(report.already_exited);
    assert_eq!(report.signals_sent, 0);
    assert!(report.leftovers_killed);
    assert!(wait_gone(job), "background job {job} survived termination");
    Ok(())
}

#[test]
fn extra_args_reach_the_shell_as_single_words() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("args.txt");
    let line = format!("printf '[%s]' > '{}'", out.display());
    let target = Target::from_command_line(&line, &["hello world".to_string(), "a;b".to_string()], true)?;

    let mut child = CommandLauncher::new(target).launch(None)?;
    assert_eq!(child.wait()?.code, Some(0));

    assert_eq!(std::fs::read_to_string(&out)?, "[hello world][a;b]");
    Ok(())
}

#[test]
fn exited_child_is_not_signalled() -> TestResult {
    init_tracing();

    let mut launcher = CommandLauncher::new(Target::Shell("exit 4".to_string()));
    let mut child = launcher.launch(None)?;
    let exit = child.wait()?;
    assert_eq!(exit.code, Some(4));

    let report = policy(200).terminate(SupervisedProcess::new(child));
    assert!(report.already_exited);
    assert_eq!(report.signals_sent, 0);
    assert_eq!(report.exit.and_then(|e| e.code), Some(4));
    Ok(())
}

#[test]
fn child_sees_changes_and_extra_env() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("env.txt");

    let mut env = BTreeMap::new();
    env.insert("APP_ENV".to_string(), "dev".to_string());
    let script = format!(
        "printf '%s\\n%s' \"$WATCHFILES_CHANGES\" \"$APP_ENV\" > '{}'",
        out.display()
    );
    let mut launcher = CommandLauncher::new(Target::Shell(script)).with_env(env);

    let batch: ChangeBatch = [added("/proj/new.py"), deleted("/proj/old.py")]
        .into_iter()
        .collect();
    let mut child = launcher.launch(Some(&batch))?;
    assert_eq!(child.wait()?.code, Some(0));

    let written = std::fs::read_to_string(&out)?;
    let mut lines = written.lines();
    let pairs: Vec<(String, String)> = serde_json::from_str(lines.next().unwrap_or_default())?;
    assert_eq!(pairs.len(), 2);
    assert!(pairs.contains(&("added".to_string(), "/proj/new.py".to_string())));
    assert!(pairs.contains(&("deleted".to_string(), "/proj/old.py".to_string())));
    assert_eq!(lines.next(), Some("dev"));
    Ok(())
}

#[test]
fn initial_launch_gets_empty_changes() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("env.txt");
    let script = format!("printf '%s' \"$WATCHFILES_CHANGES\" > '{}'", out.display());

    let mut launcher = CommandLauncher::new(Target::Shell(script));
    let mut child = launcher.launch(None)?;
    child.wait()?;

    assert_eq!(std::fs::read_to_string(&out)?, "[]");
    Ok(())
}

#[test]
fn missing_program_fails_to_launch() {
    init_tracing();

    let mut launcher = CommandLauncher::new(Target::Exec {
        program: "/nonexistent/watchrun-test-binary".to_string(),
        args: vec![],
    });
    match launcher.launch(None) {
        Err(watchrun::errors::WatchrunError::LaunchError { target, .. }) => {
            assert!(target.contains("watchrun-test-binary"));
        }
        other => panic!("expected LaunchError, got {other:?}"),
    }
}
