//! Executes notification commands on a small dedicated worker pool,
//! reusing the same child-process primitives as check execution (spec
//! §4.5: "same execution pool as checks"). Notification jobs are keyed
//! by user rather than by checkable, so they don't fit `clustermon_exec`'s
//! `CheckJob`/`ResultSink` shape; this is a thin sibling built on the
//! same [`clustermon_exec::run_process`] and [`Resolver`] primitives.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use clustermon_exec::Resolver;
use clustermon_store::{Store, StoreEvent};
use clustermon_types::checkable::CommandLine;
use clustermon_types::NotificationId;

pub struct NotifyJob {
    pub notification: NotificationId,
    pub user: String,
    pub command: CommandLine,
    pub resolver: Resolver,
    pub extra_env: BTreeMap<String, String>,
    pub timeout: Duration,
}

pub struct NotifyExecutor {
    sender: crossbeam_channel::Sender<NotifyJob>,
    _handles: Vec<std::thread::JoinHandle<()>>,
}

impl NotifyExecutor {
    pub fn new(workers: usize, store: Arc<Store>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<NotifyJob>();
        let mut handles = Vec::new();
        for worker_index in 0..workers.max(1) {
            let rx = rx.clone();
            let store = store.clone();
            let handle = std::thread::Builder::new()
                .name(format!("clustermon-notify-{worker_index}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        run_job(&store, job);
                    }
                })
                .expect("failed to spawn clustermon-notify worker thread");
            handles.push(handle);
        }
        NotifyExecutor {
            sender: tx,
            _handles: handles,
        }
    }

    /// Enqueue a job; returns immediately (spec §4.5 step 8: "enqueue an
    /// async notification execution").
    pub fn submit(&self, job: NotifyJob) {
        let _ = self.sender.send(job);
    }
}

fn run_job(store: &Store, job: NotifyJob) {
    let resolved = match &job.command {
        CommandLine::Argv(argv) => CommandLine::Argv(job.resolver.resolve_argv(argv, false).unwrap_or_else(|_| argv.clone())),
        CommandLine::Shell(line) => CommandLine::Shell(job.resolver.resolve_string(line, false).unwrap_or_else(|_| line.clone())),
    };

    let outcome = clustermon_exec::run_process(&resolved, &job.extra_env, job.timeout);
    if outcome.exit_status != 0 {
        tracing::warn!(
            notification = %job.notification,
            user = %job.user,
            exit_status = outcome.exit_status,
            "notification command exited non-zero"
        );
    }

    store.bus.publish(StoreEvent::NotificationSentToUser {
        notification: job.notification,
        user: job.user,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submitted_job_runs_and_emits_sent_to_user() {
        let store = Arc::new(Store::new());
        let rx = store.bus.subscribe();
        let executor = NotifyExecutor::new(1, store.clone());

        executor.submit(NotifyJob {
            notification: NotificationId {
                checkable: clustermon_types::CheckableId::host("web1"),
                name: "mail-host".into(),
            },
            user: "alice".into(),
            command: CommandLine::Shell("exit 0".into()),
            resolver: Resolver::new(vec![]),
            extra_env: BTreeMap::new(),
            timeout: Duration::from_secs(5),
        });

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            StoreEvent::NotificationSentToUser { user, .. } => assert_eq!(user, "alice"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
