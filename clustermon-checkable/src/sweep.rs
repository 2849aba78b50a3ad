//! Background sweep thread: periodically garbage-collects expired
//! downtimes and forces acknowledgement expiry (spec §3, §4.4).
//!
//! Grounded on the shutdown-token pattern used throughout the cluster and
//! scheduler crates: a thread parked on a condvar, woken early by
//! [`SweepHandle::stop`] rather than only by its sleep timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use clustermon_store::Store;

use crate::engine;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Shutdown {
    flag: AtomicBool,
    condvar: Condvar,
    lock: Mutex<()>,
}

/// A running sweeper; dropping this without calling [`stop`](Self::stop)
/// leaves the thread running until the process exits.
pub struct SweepHandle {
    shutdown: Arc<Shutdown>,
    join: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Signal the sweep thread to exit and block until it has.
    pub fn stop(mut self) {
        self.shutdown.flag.store(true, Ordering::SeqCst);
        self.shutdown.condvar.notify_all();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.shutdown.flag.store(true, Ordering::SeqCst);
        self.shutdown.condvar.notify_all();
    }
}

/// Spawn the sweeper against `store`, using `now` to read wall-clock time
/// at each tick (kept as a callback so tests can inject a fake clock).
pub fn spawn(store: Arc<Store>, now: impl Fn() -> f64 + Send + 'static) -> SweepHandle {
    let shutdown = Arc::new(Shutdown {
        flag: AtomicBool::new(false),
        condvar: Condvar::new(),
        lock: Mutex::new(()),
    });

    let thread_shutdown = shutdown.clone();
    let join = std::thread::Builder::new()
        .name("clustermon-sweep".into())
        .spawn(move || {
            loop {
                let guard = thread_shutdown.lock.lock().unwrap_or_else(|e| e.into_inner());
                let (_guard, _timeout) = thread_shutdown
                    .condvar
                    .wait_timeout(guard, SWEEP_INTERVAL)
                    .unwrap_or_else(|e| e.into_inner());
                if thread_shutdown.flag.load(Ordering::SeqCst) {
                    break;
                }
                engine::sweep_downtimes_and_acks(&store, now());
            }
        })
        .expect("failed to spawn clustermon-sweep thread");

    SweepHandle {
        shutdown,
        join: Some(join),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_types::checkable::{AckKind, Acknowledgement, CommandLine};
    use clustermon_types::Checkable;

    #[test]
    fn sweep_clears_expired_acknowledgement() {
        let store = Arc::new(Store::new());
        let mut host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        host.acknowledgement = Acknowledgement {
            kind: AckKind::Normal,
            author: "alice".into(),
            comment: "investigating".into(),
            expiry: 100.0,
        };
        let id = host.id.clone();
        store.insert_checkable(host);

        let rx = store.bus.subscribe();
        engine::sweep_downtimes_and_acks(&store, 50.0);
        assert!(rx.try_recv().is_err());
        assert!(matches!(
            store.get_checkable(&id).unwrap().lock().acknowledgement.kind,
            AckKind::Normal
        ));

        engine::sweep_downtimes_and_acks(&store, 150.0);
        assert!(matches!(
            store.get_checkable(&id).unwrap().lock().acknowledgement.kind,
            AckKind::None
        ));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn zero_expiry_never_clears() {
        let store = Arc::new(Store::new());
        let mut host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        host.acknowledgement = Acknowledgement {
            kind: AckKind::Sticky,
            author: "bob".into(),
            comment: "won't clear".into(),
            expiry: 0.0,
        };
        let id = host.id.clone();
        store.insert_checkable(host);

        engine::sweep_downtimes_and_acks(&store, 1_000_000.0);
        assert!(matches!(
            store.get_checkable(&id).unwrap().lock().acknowledgement.kind,
            AckKind::Sticky
        ));
    }
}
