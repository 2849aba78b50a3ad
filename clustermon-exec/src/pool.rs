//! The check-execution pool (spec §4.3, §5): a small fixed number of
//! worker threads pull jobs off a shared queue and run them to
//! completion, handing the resulting [`CheckResult`] to a [`ResultSink`].
//! The same pool type is reused for notification command execution
//! (spec §4.5) since both are "run a command, collect output".

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use clustermon_types::checkable::CommandLine;
use clustermon_types::{CheckResult, CheckSource, CheckableId};

use crate::macros::Resolver;
use crate::{output, process};

pub trait ResultSink: Send + Sync {
    fn deliver(&self, id: CheckableId, result: CheckResult);
}

pub struct CheckJob {
    pub id: CheckableId,
    pub command: CommandLine,
    pub resolver: Resolver,
    pub extra_env: BTreeMap<String, String>,
    pub timeout: Duration,
    pub schedule_start: f64,
    pub check_source: CheckSource,
}

pub struct ExecutorPool {
    sender: crossbeam_channel::Sender<CheckJob>,
    _handles: Vec<std::thread::JoinHandle<()>>,
}

impl ExecutorPool {
    /// Spawn `workers` (minimum 1) long-lived threads pulling from a
    /// shared unbounded queue. `now` supplies wall-clock seconds for
    /// `schedule_end`/`execution_start`/`execution_end` stamps.
    pub fn new(workers: usize, sink: Arc<dyn ResultSink>, now: Arc<dyn Fn() -> f64 + Send + Sync>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<CheckJob>();
        let mut handles = Vec::new();
        for worker_index in 0..workers.max(1) {
            let rx = rx.clone();
            let sink = sink.clone();
            let now = now.clone();
            let handle = std::thread::Builder::new()
                .name(format!("clustermon-exec-{worker_index}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let id = job.id.clone();
                        let result = execute(job, now.as_ref());
                        sink.deliver(id, result);
                    }
                })
                .expect("failed to spawn clustermon-exec worker thread");
            handles.push(handle);
        }
        ExecutorPool {
            sender: tx,
            _handles: handles,
        }
    }

    /// Enqueue a job; returns immediately (spec §4.2 step 4: "release the
    /// scheduler lock; enqueue an async work item").
    pub fn submit(&self, job: CheckJob) {
        let _ = self.sender.send(job);
    }
}

fn execute(job: CheckJob, now: &(dyn Fn() -> f64 + Send + Sync)) -> CheckResult {
    let resolved_command = match &job.command {
        CommandLine::Argv(argv) => CommandLine::Argv(job.resolver.resolve_argv(argv, false).unwrap_or_else(|_| argv.clone())),
        CommandLine::Shell(line) => CommandLine::Shell(job.resolver.resolve_string(line, false).unwrap_or_else(|_| line.clone())),
    };

    let execution_start = now();
    let executed = process::run(&resolved_command, &job.extra_env, job.timeout);
    let execution_end = now();
    let parsed = output::parse(&executed.output);

    CheckResult {
        schedule_start: job.schedule_start,
        schedule_end: execution_start,
        execution_start,
        execution_end,
        exit_status: executed.exit_status,
        output: parsed.short,
        long_output: parsed.long,
        perfdata: parsed.perfdata,
        check_source: job.check_source,
        active: true,
        vars_before: None,
        vars_after: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Condvar, Mutex};

    struct CollectingSink {
        lock: Mutex<Vec<(CheckableId, CheckResult)>>,
        condvar: Condvar,
    }

    impl ResultSink for CollectingSink {
        fn deliver(&self, id: CheckableId, result: CheckResult) {
            let mut guard = self.lock.lock().unwrap();
            guard.push((id, result));
            self.condvar.notify_all();
        }
    }

    #[test]
    fn executes_job_and_delivers_result() {
        let sink = Arc::new(CollectingSink {
            lock: Mutex::new(Vec::new()),
            condvar: Condvar::new(),
        });
        let pool = ExecutorPool::new(2, sink.clone(), Arc::new(|| 42.0));

        pool.submit(CheckJob {
            id: CheckableId::host("web1"),
            command: CommandLine::Argv(vec!["sh".into(), "-c".into(), "echo OK - fine; exit 0".into()]),
            resolver: Resolver::new(vec![]),
            extra_env: BTreeMap::new(),
            timeout: Duration::from_secs(5),
            schedule_start: 40.0,
            check_source: CheckSource::Local("test".into()),
        });

        let guard = sink.lock.lock().unwrap();
        let (guard, _) = sink
            .condvar
            .wait_timeout_while(guard, Duration::from_secs(5), |v| v.is_empty())
            .unwrap();
        assert_eq!(guard.len(), 1);
        assert_eq!(guard[0].1.exit_status, 0);
        assert_eq!(guard[0].1.output, "OK - fine");
    }
}
