//! Dependency reachability (spec §3, §4.4).

use clustermon_types::dependency::DependencyPurpose;
use clustermon_types::{Checkable, TimePeriodRegistry};
use clustermon_store::Store;

/// A child is reachable for `purpose` iff every dependency edge gating
/// that purpose is satisfied: parent state matches the filter, parent's
/// result is pending, parent is soft, or parent is outside its period.
pub fn is_reachable(
    store: &Store,
    checkable: &Checkable,
    purpose: DependencyPurpose,
    periods: &dyn TimePeriodRegistry,
    now: f64,
) -> bool {
    for dep in &checkable.dependencies {
        if !dep.gates(purpose) {
            continue;
        }

        let satisfied = match store.get_checkable(&dep.parent) {
            None => true, // unknown parent: fail open, nothing to gate on
            Some(parent) => {
                let parent = parent.lock();
                let pending = parent.last_check_result.is_none();
                let soft = matches!(parent.state_type, clustermon_types::StateType::Soft);
                let outside_period = dep.period.is_some() && !periods.is_inside(&dep.period, now);
                let state_match = dep.state_filter.matches(parent.current_state.filter_bit());
                state_match || pending || soft || outside_period
            }
        };

        if !satisfied {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_types::checkable::CommandLine;
    use clustermon_types::{CheckableId, Dependency, StateFilter};

    #[test]
    fn reachable_when_no_dependencies() {
        let store = Store::new();
        let child = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        assert!(is_reachable(&store, &child, DependencyPurpose::Notification, &clustermon_types::AlwaysInside, 0.0));
    }

    #[test]
    fn unreachable_when_parent_down_and_filter_excludes() {
        let store = Store::new();
        let parent = Checkable::new_host("router1", CommandLine::Argv(vec!["x".into()]));
        let parent_id = parent.id.clone();
        {
            let handle = store.insert_checkable(parent);
            handle.lock().current_state = clustermon_types::checkable::CurrentState::Host(clustermon_types::checkable::HostState::Down);
            handle.lock().state_type = clustermon_types::StateType::Hard;
            handle.lock().last_check_result = Some(dummy_result());
        }

        let mut child = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        child.dependencies.push(Dependency {
            parent: parent_id,
            child: child.id.clone(),
            state_filter: StateFilter(16), // only Up satisfies
            period: None,
            disable_checks: false,
            disable_notifications: true,
        });

        assert!(!is_reachable(&store, &child, DependencyPurpose::Notification, &clustermon_types::AlwaysInside, 0.0));
        // CheckExecution isn't gated by this edge.
        assert!(is_reachable(&store, &child, DependencyPurpose::CheckExecution, &clustermon_types::AlwaysInside, 0.0));
    }

    fn dummy_result() -> clustermon_types::CheckResult {
        clustermon_types::CheckResult {
            schedule_start: 0.0,
            schedule_end: 0.0,
            execution_start: 0.0,
            execution_end: 0.0,
            exit_status: 0,
            output: String::new(),
            long_output: String::new(),
            perfdata: vec![],
            check_source: clustermon_types::CheckSource::Local("test".into()),
            active: true,
            vars_before: None,
            vars_after: None,
        }
    }
}
