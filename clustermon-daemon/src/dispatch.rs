//! Bridges the scheduler to the execution pool and the execution pool
//! back into the state machine (spec §4.2 step 4, §4.3, §4.4), grounded
//! on `clustermon_notify::dispatch::build_resolver`'s layered-scope
//! pattern for macro resolution.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use clustermon_checkable::{process_check_result, GlobalFlags};
use clustermon_exec::{CheckJob, ExecutorPool, MacroScope, MapScope, Resolver, ResultSink, VarsScope};
use clustermon_interfaces::{PerfdataSink, ProgramStatus};
use clustermon_scheduler::{Dispatcher, Scheduler};
use clustermon_store::Store;
use clustermon_types::{AlwaysInside, CheckResult, CheckSource, CheckableId, MacroValue};

use crate::authority::ClusterAuthority;

/// Scheduler type this binary wires up: sole TimePeriodRegistry is
/// `AlwaysInside` since the config object language's time-period DSL
/// (apply rules, period definitions) is outside this build's scope — see
/// DESIGN.md.
pub type DaemonScheduler = Scheduler<Arc<ClusterAuthority>, AlwaysInside>;

/// Turns a due `CheckableId` into a resolved [`CheckJob`] and submits it
/// to the executor pool (spec §4.2 step 4: "release the scheduler lock;
/// enqueue an async work item").
pub struct CheckDispatcher {
    pub store: Arc<Store>,
    pub pool: Arc<ExecutorPool>,
    pub check_timeout: Duration,
}

impl Dispatcher for CheckDispatcher {
    fn dispatch(&self, id: CheckableId) {
        let Some(handle) = self.store.get_checkable(&id) else {
            return;
        };
        let (command, schedule_start, resolver) = {
            let c = handle.lock();
            (c.check_command.clone(), c.next_check, build_check_resolver(&id, &c))
        };

        self.pool.submit(CheckJob {
            id,
            command,
            resolver,
            extra_env: BTreeMap::new(),
            timeout: self.check_timeout,
            schedule_start,
            check_source: CheckSource::Local("clustermond".to_string()),
        });
    }
}

fn build_check_resolver(id: &CheckableId, c: &clustermon_types::Checkable) -> Resolver {
    let mut map = BTreeMap::new();
    map.insert("host.name".to_string(), MacroValue::String(id.host_name().to_string()));
    if let Some(service) = id.service_name() {
        map.insert("service.name".to_string(), MacroValue::String(service.to_string()));
    }
    map.insert("check.attempt".to_string(), MacroValue::String(c.attempt.to_string()));

    let scopes: Vec<Box<dyn MacroScope>> = vec![Box::new(MapScope(map)), Box::new(VarsScope(c.vars.clone()))];
    Resolver::new(scopes)
}

/// Feeds a completed [`CheckResult`] back through the state machine and
/// releases the Checkable from Pending (spec §4.2 step 5, §4.4).
pub struct CheckResultSink {
    pub store: Arc<Store>,
    pub scheduler: Arc<DaemonScheduler>,
    pub status: Arc<ProgramStatus>,
    pub perfdata_sink: Arc<dyn PerfdataSink>,
    pub identity: String,
    pub now: Arc<dyn Fn() -> f64 + Send + Sync>,
}

impl ResultSink for CheckResultSink {
    fn deliver(&self, id: CheckableId, result: CheckResult) {
        let now = (self.now)();
        let flags = self.status.snapshot();
        let globals = GlobalFlags {
            enable_flapping: flags.flap_detection_enabled,
            enable_notifications: flags.notifications_enabled,
        };

        if flags.performance_data_enabled && !result.perfdata.is_empty() {
            self.perfdata_sink.emit(&id, now, &result.perfdata);
        }

        process_check_result(&self.store, &id, result, &AlwaysInside, globals, &self.identity, now);
        self.status.record_check();
        self.scheduler.on_execution_complete(id);
    }
}

/// Applies an authority election result to this node's scheduler and
/// notify-sweep view (spec §4.6: "the losing node removes the object
/// from its scheduler; the winning node enqueues it").
pub fn apply_authority_change(authority: &ClusterAuthority, scheduler: &DaemonScheduler, feature: clustermon_store::ClusterFeature, id: &CheckableId, gained: bool, now: f64) {
    match feature {
        clustermon_store::ClusterFeature::Checker => {
            authority.set_checker(id.clone(), gained);
            if gained {
                scheduler.enqueue(id.clone(), now);
            } else {
                scheduler.remove(id);
            }
        }
        clustermon_store::ClusterFeature::Notifications => {
            authority.set_notifications(id.clone(), gained);
        }
    }
}
