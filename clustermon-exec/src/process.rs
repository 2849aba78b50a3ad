//! Child-process execution with a bounded wall-clock timeout (spec §4.3,
//! §5). A worker polls the child with `try_wait` instead of blocking in
//! `wait`, so the same thread can hop to other work if this crate's pool
//! grows to genuinely multiplex (see [`crate::pool`]).

use std::collections::BTreeMap;
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use clustermon_types::checkable::CommandLine;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Synthetic exit status for a process that failed to spawn or was
/// killed on timeout (spec §4.3).
pub const SYNTHETIC_FAILURE_EXIT: i32 = 128;

pub struct ExecutedProcess {
    pub exit_status: i32,
    pub output: String,
    pub timed_out: bool,
}

/// Run `command` to completion or `timeout`, whichever comes first.
/// `extra_env` is layered over the inherited environment, overriding
/// collisions (spec §4.3).
pub fn run(command: &CommandLine, extra_env: &BTreeMap<String, String>, timeout: Duration) -> ExecutedProcess {
    let mut cmd = match command {
        CommandLine::Argv(argv) => {
            let Some((exe, args)) = argv.split_first() else {
                return ExecutedProcess {
                    exit_status: SYNTHETIC_FAILURE_EXIT,
                    output: "empty command line".to_string(),
                    timed_out: false,
                };
            };
            let mut c = Command::new(exe);
            c.args(args);
            c
        }
        CommandLine::Shell(line) => {
            let mut c = shell_command();
            c.arg(line);
            c
        }
    };

    cmd.envs(extra_env.iter());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return ExecutedProcess {
                exit_status: SYNTHETIC_FAILURE_EXIT,
                output: format!("failed to execute command: {err}"),
                timed_out: false,
            };
        }
    };

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    break None;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(_) => break None,
        }
    };

    match status {
        Some(status) => {
            let mut output = String::new();
            if let Some(mut stdout) = child.stdout.take() {
                let _ = stdout.read_to_string(&mut output);
            }
            if output.trim().is_empty() {
                if let Some(mut stderr) = child.stderr.take() {
                    let mut err_output = String::new();
                    let _ = stderr.read_to_string(&mut err_output);
                    output = err_output;
                }
            }
            ExecutedProcess {
                exit_status: status.code().unwrap_or(SYNTHETIC_FAILURE_EXIT),
                output,
                timed_out: false,
            }
        }
        None => {
            let _ = child.kill();
            let _ = child.wait();
            ExecutedProcess {
                exit_status: SYNTHETIC_FAILURE_EXIT,
                output: format!("check timed out after {:.1}s", timeout.as_secs_f64()),
                timed_out: true,
            }
        }
    }
}

#[cfg(unix)]
fn shell_command() -> Command {
    let mut c = Command::new("sh");
    c.arg("-c");
    c
}

#[cfg(not(unix))]
fn shell_command() -> Command {
    let mut c = Command::new("cmd");
    c.arg("/C");
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_exit_code() {
        let result = run(
            &CommandLine::Argv(vec!["sh".into(), "-c".into(), "echo hello; exit 2".into()]),
            &BTreeMap::new(),
            Duration::from_secs(5),
        );
        assert_eq!(result.exit_status, 2);
        assert_eq!(result.output.trim(), "hello");
        assert!(!result.timed_out);
    }

    #[test]
    fn kills_process_exceeding_timeout() {
        let result = run(
            &CommandLine::Argv(vec!["sh".into(), "-c".into(), "sleep 5".into()]),
            &BTreeMap::new(),
            Duration::from_millis(100),
        );
        assert!(result.timed_out);
        assert_eq!(result.exit_status, SYNTHETIC_FAILURE_EXIT);
    }

    #[test]
    fn nonexistent_executable_produces_synthetic_failure() {
        let result = run(
            &CommandLine::Argv(vec!["/no/such/executable-xyz".into()]),
            &BTreeMap::new(),
            Duration::from_secs(5),
        );
        assert_eq!(result.exit_status, SYNTHETIC_FAILURE_EXIT);
        assert!(!result.timed_out);
    }

    #[test]
    fn extra_env_is_layered_over_inherited() {
        let mut env = BTreeMap::new();
        env.insert("CLUSTERMON_TEST_VAR".to_string(), "expected".to_string());
        let result = run(
            &CommandLine::Shell("echo $CLUSTERMON_TEST_VAR".into()),
            &env,
            Duration::from_secs(5),
        );
        assert_eq!(result.output.trim(), "expected");
    }
}
