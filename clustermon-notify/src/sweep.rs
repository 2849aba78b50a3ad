//! Periodic renotify sweep (spec §4.5): every 5s, re-fire reminder
//! notifications for every Notification whose `next_notification <= now`
//! and whose parent is a reachable, non-acknowledged, non-downtime, hard
//! non-OK checkable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use clustermon_checkable::is_reachable;
use clustermon_store::Store;
use clustermon_types::{DependencyPurpose, NotificationType, StateType, TimePeriodRegistry};

use crate::dispatch::dispatch_one;
use crate::executor::NotifyExecutor;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

struct Shutdown {
    flag: AtomicBool,
    condvar: Condvar,
    lock: Mutex<()>,
}

pub struct SweepHandle {
    shutdown: Arc<Shutdown>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl SweepHandle {
    pub fn stop(&mut self) {
        self.shutdown.flag.store(true, Ordering::SeqCst);
        self.shutdown.condvar.notify_all();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the background renotify-sweep thread. `holds_authority` gates
/// each notification's parent: in a clustered deployment only the node
/// that currently holds notification authority for a checkable (spec
/// §4.6) should re-fire its reminders, so a non-owning node's sweep is a
/// no-op for it. A single-node deployment passes `|_| true`.
pub fn spawn(
    store: Arc<Store>,
    periods: Arc<dyn TimePeriodRegistry>,
    executor: Arc<NotifyExecutor>,
    holds_authority: Arc<dyn Fn(&clustermon_types::CheckableId) -> bool + Send + Sync>,
    now: impl Fn() -> f64 + Send + Sync + 'static,
) -> SweepHandle {
    let shutdown = Arc::new(Shutdown {
        flag: AtomicBool::new(false),
        condvar: Condvar::new(),
        lock: Mutex::new(()),
    });
    let shutdown_thread = shutdown.clone();
    let now = Arc::new(now);

    let join = std::thread::Builder::new()
        .name("clustermon-notify-sweep".to_string())
        .spawn(move || loop {
            let guard = shutdown_thread.lock.lock().unwrap_or_else(|e| e.into_inner());
            let (_guard, timeout) = shutdown_thread
                .condvar
                .wait_timeout_while(guard, SWEEP_INTERVAL, |_| !shutdown_thread.flag.load(Ordering::SeqCst))
                .unwrap_or_else(|e| e.into_inner());
            if !timeout.timed_out() {
                return;
            }
            sweep_once(&store, periods.as_ref(), &executor, holds_authority.as_ref(), now());
        })
        .expect("failed to spawn clustermon-notify-sweep thread");

    SweepHandle {
        shutdown,
        join: Some(join),
    }
}

fn sweep_once(store: &Store, periods: &dyn TimePeriodRegistry, executor: &NotifyExecutor, holds_authority: &(dyn Fn(&clustermon_types::CheckableId) -> bool), now: f64) {
    for (notification_id, n_handle) in store.all_notifications() {
        if !holds_authority(&notification_id.checkable) {
            continue;
        }

        let due = n_handle.lock().next_notification <= now;
        if !due {
            continue;
        }

        let Some(c_handle) = store.get_checkable(&notification_id.checkable) else {
            continue;
        };

        let (current_state, last_hard_state_change, host_vars, eligible) = {
            let c = c_handle.lock();
            let hard_non_ok = c.state_type == StateType::Hard && !c.current_state.is_ok();
            let reachable = is_reachable(store, &c, DependencyPurpose::Notification, periods, now);
            let eligible = hard_non_ok && reachable && !c.in_downtime() && !c.is_acknowledged() && c.notifications_enabled;
            (c.current_state, c.last_hard_state_change, c.vars.clone(), eligible)
        };

        if !eligible {
            continue;
        }

        dispatch_one(
            store,
            periods,
            executor,
            &notification_id.checkable,
            &notification_id,
            &n_handle,
            current_state,
            last_hard_state_change,
            &host_vars,
            NotificationType::Problem,
            false,
            now,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_store::StoreEvent;
    use clustermon_types::checkable::{CommandLine, CurrentState, HostState};
    use clustermon_types::notification::EscalationTimes;
    use clustermon_types::{AlwaysInside, Checkable, Notification, NotificationId, StateFilter, TypeFilter, User};

    fn due_notification(checkable: clustermon_types::CheckableId) -> Notification {
        Notification {
            name: "mail-host".into(),
            parent: checkable,
            command: "exit 0".into(),
            users: vec!["alice".into()],
            user_groups: vec![],
            period: None,
            state_filter: StateFilter::ALL,
            type_filter: TypeFilter::ALL,
            interval: 1800.0,
            times: EscalationTimes { begin: None, end: None },
            last_notification: 0.0,
            last_problem_notification: 0.0,
            next_notification: 0.0,
            notification_number: 2,
        }
    }

    #[test]
    fn reminder_fires_for_hard_problem_and_reschedules() {
        let store = Arc::new(Store::new());
        let mut host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        host.current_state = CurrentState::Host(HostState::Down);
        host.state_type = StateType::Hard;
        let id = host.id.clone();
        store.insert_checkable(host);
        store.insert_user(User {
            name: "alice".into(),
            period: None,
            state_filter: StateFilter::ALL,
            type_filter: TypeFilter::ALL,
            enable_notifications: true,
            channels: vec!["mail".into()],
        });

        let nid = NotificationId { checkable: id.clone(), name: "mail-host".into() };
        store.insert_notification(nid.clone(), due_notification(id.clone()));

        let executor = Arc::new(NotifyExecutor::new(1, store.clone()));
        let rx = store.bus.subscribe();

        sweep_once(&store, &AlwaysInside, &executor, &|_| true, 1000.0);

        let n = store.get_notification(&nid).unwrap();
        assert_eq!(n.lock().notification_number, 3);
        assert!(n.lock().next_notification > 1000.0);

        let mut saw_fan_out = false;
        while let Ok(ev) = rx.recv_timeout(Duration::from_secs(2)) {
            if let StoreEvent::NotificationSentToAllUsers { .. } = ev {
                saw_fan_out = true;
                break;
            }
        }
        assert!(saw_fan_out);
    }

    #[test]
    fn reminder_skipped_when_acknowledged() {
        let store = Arc::new(Store::new());
        let mut host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        host.current_state = CurrentState::Host(HostState::Down);
        host.state_type = StateType::Hard;
        host.acknowledgement = clustermon_types::checkable::Acknowledgement {
            kind: clustermon_types::checkable::AckKind::Sticky,
            author: "oncall".into(),
            comment: "known".into(),
            expiry: 0.0,
        };
        let id = host.id.clone();
        store.insert_checkable(host);

        let nid = NotificationId { checkable: id.clone(), name: "mail-host".into() };
        store.insert_notification(nid.clone(), due_notification(id.clone()));

        let executor = Arc::new(NotifyExecutor::new(1, store.clone()));
        sweep_once(&store, &AlwaysInside, &executor, &|_| true, 1000.0);

        let n = store.get_notification(&nid).unwrap();
        assert_eq!(n.lock().notification_number, 2, "ack'd checkable must not re-notify");
    }
}
