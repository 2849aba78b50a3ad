//! The check scheduler (spec §4.2): a thread that takes the smallest
//! `next_check` out of Idle, verifies it is still owned and due, and
//! hands it to the execution pool via a [`Dispatcher`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex as StdMutex};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use clustermon_types::{CheckableKind, StateType, TimePeriodRegistry};
use clustermon_store::Store;
use clustermon_checkable::is_check_gated;

use crate::authority::AuthorityOracle;
use crate::dispatch::Dispatcher;
use crate::index::TimeIndex;

/// Clock jumps larger than this (wall time advancing further than the
/// scheduler's own sleep interval would explain) shift every deadline by
/// the observed delta (spec §4.2).
const CLOCK_STEP_THRESHOLD: f64 = 15.0;

/// Upper bound on how long the dispatch thread ever sleeps before
/// re-checking Idle, so that out-of-band `next_check` changes and
/// shutdown are noticed promptly even with nothing due.
const MAX_POLL: Duration = Duration::from_millis(100);

struct Wake {
    lock: StdMutex<()>,
    condvar: Condvar,
}

pub struct Scheduler<A: AuthorityOracle, P: TimePeriodRegistry> {
    store: Arc<Store>,
    idle: Mutex<TimeIndex>,
    pending: Mutex<TimeIndex>,
    authority: A,
    periods: P,
    wake: Wake,
    shutdown: AtomicBool,
    global_active_checks_enabled: AtomicBool,
    now: Box<dyn Fn() -> f64 + Send + Sync>,
}

impl<A: AuthorityOracle, P: TimePeriodRegistry> Scheduler<A, P> {
    pub fn new(store: Arc<Store>, authority: A, periods: P, now: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        Scheduler {
            store,
            idle: Mutex::new(TimeIndex::new()),
            pending: Mutex::new(TimeIndex::new()),
            authority,
            periods,
            wake: Wake {
                lock: StdMutex::new(()),
                condvar: Condvar::new(),
            },
            shutdown: AtomicBool::new(false),
            global_active_checks_enabled: AtomicBool::new(true),
            now: Box::new(now),
        }
    }

    pub fn set_global_active_checks_enabled(&self, enabled: bool) {
        self.global_active_checks_enabled.store(enabled, Ordering::SeqCst);
        self.wake();
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake();
    }

    fn wake(&self) {
        let _guard = self.wake.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.wake.condvar.notify_all();
    }

    /// Add (or schedule for the first time) a Checkable into Idle.
    pub fn enqueue(&self, id: clustermon_types::CheckableId, next_check: f64) {
        self.idle.lock().upsert(id, next_check);
        self.wake();
    }

    /// Drop a Checkable from scheduling entirely (deleted, or authority
    /// lost permanently — spec §4.6 "losing node removes the object").
    pub fn remove(&self, id: &clustermon_types::CheckableId) {
        self.idle.lock().remove(id);
        self.pending.lock().remove(id);
    }

    /// React to an out-of-band `next_check` mutation (external command,
    /// cluster replication). Only Idle members are reordered; a Pending
    /// member's new next_check takes effect when it's reinserted on
    /// completion (spec §4.2).
    pub fn reschedule(&self, id: clustermon_types::CheckableId, next_check: f64) {
        let mut idle = self.idle.lock();
        if idle.contains(&id) {
            idle.upsert(id, next_check);
            drop(idle);
            self.wake();
        }
    }

    pub fn idle_len(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run one dispatch pass: if the head of Idle is due, remove it,
    /// re-validate authority and gates, and either dispatch it or
    /// reinsert it with a recomputed deadline. Returns `true` if
    /// anything was dispatched.
    pub fn dispatch_once(&self, dispatcher: &dyn Dispatcher) -> bool {
        let now = (self.now)();
        let due = {
            let idle = self.idle.lock();
            match idle.peek_due() {
                Some(t) if t <= now => true,
                _ => false,
            }
        };
        if !due {
            return false;
        }

        let id = {
            let mut idle = self.idle.lock();
            match idle.pop_front() {
                Some(id) => id,
                None => return false,
            }
        };

        let Some(handle) = self.store.get_checkable(&id) else {
            return false;
        };

        if !self.authority.holds_checker_authority(&id) {
            tracing::debug!(checkable = %id, "authority lost, dropping from scheduler");
            return false;
        }

        if !self.global_active_checks_enabled.load(Ordering::SeqCst) {
            self.idle.lock().upsert(id, now + 1.0);
            return false;
        }

        let gated = {
            let c = handle.lock();
            is_check_gated(&self.store, &c, &self.periods, true, now) && !c.force_next_check
        };

        if gated {
            let next = {
                let c = handle.lock();
                now + c.retry_interval.max(1.0)
            };
            self.idle.lock().upsert(id, next);
            return false;
        }

        {
            let mut c = handle.lock();
            c.force_next_check = false;
        }

        self.pending.lock().upsert(id.clone(), now);
        dispatcher.dispatch(id);
        true
    }

    /// Called by the execution pool once a CheckResult has been processed
    /// by the state machine (spec §4.2: "removes from Pending and
    /// re-inserts into Idle iff the Checkable is still active and still
    /// owned").
    pub fn on_execution_complete(&self, id: clustermon_types::CheckableId) {
        self.pending.lock().remove(&id);

        let Some(handle) = self.store.get_checkable(&id) else {
            return;
        };
        if !self.authority.holds_checker_authority(&id) {
            return;
        }

        let now = (self.now)();
        let next = {
            let c = handle.lock();
            if !c.active_checks_enabled {
                return;
            }
            let interval = match (c.kind, c.state_type) {
                (CheckableKind::Host, StateType::Soft) | (CheckableKind::Service, StateType::Soft) => c.retry_interval,
                _ => c.check_interval,
            };
            now + interval.max(1.0)
        };
        self.idle.lock().upsert(id, next);
        self.wake();
    }

    /// Drive the scheduler loop until [`stop`](Self::stop) is called.
    /// Blocks the calling thread; run it on a dedicated `std::thread`.
    pub fn run(&self, dispatcher: &dyn Dispatcher) {
        let mut last_wall = SystemTime::now();
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }

            while self.dispatch_once(dispatcher) {}

            let sleep_for = {
                let idle = self.idle.lock();
                match idle.peek_due() {
                    Some(due) => {
                        let now = (self.now)();
                        Duration::from_secs_f64((due - now).clamp(0.0, MAX_POLL.as_secs_f64()))
                    }
                    None => MAX_POLL,
                }
            };

            let guard = self.wake.lock.lock().unwrap_or_else(|e| e.into_inner());
            let (_guard, _timeout) = self
                .wake
                .condvar
                .wait_timeout(guard, sleep_for)
                .unwrap_or_else(|e| e.into_inner());

            self.detect_clock_step(&mut last_wall, sleep_for);
        }
    }

    /// Compare elapsed wall-clock time against the sleep we asked for; a
    /// jump larger than [`CLOCK_STEP_THRESHOLD`] beyond what the sleep
    /// explains means the wall clock itself stepped (NTP correction,
    /// manual date change — spec §4.2), so every deadline shifts by the
    /// same delta. A monotonic clock can't observe this by definition, so
    /// this compares two `SystemTime` snapshots rather than `Instant`.
    fn detect_clock_step(&self, last_wall: &mut SystemTime, slept_for: Duration) {
        let now = SystemTime::now();
        let elapsed = match now.duration_since(*last_wall) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        };
        *last_wall = now;
        let drift = elapsed - slept_for.as_secs_f64();
        if drift.abs() > CLOCK_STEP_THRESHOLD {
            tracing::warn!(drift_seconds = drift, "clock step detected, shifting scheduler deadlines");
            self.idle.lock().shift_all(drift);
        }
    }
}

#[cfg(test)]
mod clock_step_tests {
    use super::*;
    use crate::authority::SoleAuthority;
    use clustermon_store::Store;
    use clustermon_types::AlwaysInside;

    fn new_scheduler() -> Scheduler<SoleAuthority, AlwaysInside> {
        Scheduler::new(Arc::new(Store::new()), SoleAuthority, AlwaysInside, || 0.0)
    }

    #[test]
    fn forward_wall_clock_jump_shifts_idle_deadlines() {
        let sched = new_scheduler();
        let id = clustermon_types::CheckableId::host("web1");
        sched.idle.lock().upsert(id.clone(), 100.0);

        let mut last_wall = SystemTime::now() - Duration::from_secs(60);
        sched.detect_clock_step(&mut last_wall, Duration::from_millis(100));

        // Elapsed (~60s) vastly exceeds the requested 100ms sleep, so this
        // reads as a forward wall-clock step and every deadline shifts.
        assert!(sched.idle.lock().peek_due().unwrap() > 100.0);
    }

    #[test]
    fn small_scheduling_jitter_does_not_shift_deadlines() {
        let sched = new_scheduler();
        let id = clustermon_types::CheckableId::host("web1");
        sched.idle.lock().upsert(id, 100.0);

        let mut last_wall = SystemTime::now() - Duration::from_millis(100);
        sched.detect_clock_step(&mut last_wall, Duration::from_millis(100));

        assert_eq!(sched.idle.lock().peek_due(), Some(100.0));
    }
}
