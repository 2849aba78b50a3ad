//! Per-Notification dispatch and per-user fan-out (spec §4.5 steps 1-8).

use std::collections::BTreeMap;
use std::time::Duration;

use clustermon_checkable::is_reachable;
use clustermon_exec::{MacroScope, MapScope, Resolver, VarsScope};
use clustermon_store::{Store, StoreEvent};
use clustermon_types::checkable::{CommandLine, CurrentState};
use clustermon_types::vars::MacroValue;
use clustermon_types::{CheckableId, DependencyPurpose, NotificationType, TimePeriodRegistry, User, VarsBag};

use crate::executor::{NotifyExecutor, NotifyJob};
use crate::filter;

const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatch notifications for `checkable_id` (spec §4.5): called both from
/// the state-change trigger (`SendNotifications(type, cr)`) and from the
/// periodic renotify sweep.
pub fn send_notifications(
    store: &Store,
    periods: &dyn TimePeriodRegistry,
    executor: &NotifyExecutor,
    checkable_id: &CheckableId,
    notification_type: NotificationType,
    now: f64,
) {
    let Some(handle) = store.get_checkable(checkable_id) else {
        return;
    };

    let (forced, current_state, last_hard_state_change, host_vars) = {
        let c = handle.lock();
        if filter::suppressed_by_checkable_state(&c, notification_type) && !c.force_next_notification {
            return;
        }
        (c.force_next_notification, c.current_state, c.last_hard_state_change, c.vars.clone())
    };

    let reachable = {
        let c = handle.lock();
        is_reachable(store, &c, DependencyPurpose::Notification, periods, now)
    };
    if !reachable && !forced {
        return;
    }

    for (notification_id, n_handle) in store.notifications_for(checkable_id) {
        dispatch_one(
            store,
            periods,
            executor,
            checkable_id,
            &notification_id,
            &n_handle,
            current_state,
            last_hard_state_change,
            &host_vars,
            notification_type,
            forced,
            now,
        );
    }
}

/// Evaluate and, if admitted, fan out a single Notification (spec §4.5
/// steps 1-8). Shared by the state-change trigger ([`send_notifications`])
/// and the periodic renotify sweep, which already knows which single
/// Notification is due and doesn't want to re-evaluate its siblings.
#[allow(clippy::too_many_arguments)]
pub(crate) fn dispatch_one(
    store: &Store,
    periods: &dyn TimePeriodRegistry,
    executor: &NotifyExecutor,
    checkable_id: &CheckableId,
    notification_id: &clustermon_types::NotificationId,
    n_handle: &clustermon_store::Handle<clustermon_types::Notification>,
    current_state: CurrentState,
    last_hard_state_change: f64,
    host_vars: &VarsBag,
    notification_type: NotificationType,
    forced: bool,
    now: f64,
) {
    let command;
    let users;
    let groups;
    {
        let mut n = n_handle.lock();
        if !filter::admits(&n, current_state, notification_type, last_hard_state_change, periods, now, forced) {
            return;
        }

        n.last_notification = now;
        match notification_type {
            NotificationType::Problem => {
                n.last_problem_notification = now;
                n.advance_number();
                if n.interval > 0.0 {
                    n.next_notification = now + n.interval;
                }
            }
            NotificationType::Recovery => n.reset_number(),
            _ => {}
        }

        command = n.command.clone();
        users = n.users.clone();
        groups = n.user_groups.clone();
    }

    let resolved_users = store.resolve_users(&users, &groups);
    let mut notified = Vec::new();
    for user in &resolved_users {
        if !filter::user_admits(user, current_state, notification_type, periods, now) {
            continue;
        }

        let resolver = build_resolver(checkable_id, host_vars, &notification_id.name, &command, user, notification_type);
        executor.submit(NotifyJob {
            notification: notification_id.clone(),
            user: user.name.clone(),
            command: CommandLine::Shell(command.clone()),
            resolver,
            extra_env: BTreeMap::new(),
            timeout: NOTIFICATION_TIMEOUT,
        });
        notified.push(user.name.clone());
    }

    store.bus.publish(StoreEvent::NotificationSentToAllUsers {
        notification: notification_id.clone(),
        users: notified,
    });
}

/// Macro resolver layered {user, notification, checkable, host, command,
/// application} (spec §4.5: "a resolver list that layers {user,
/// notification, checkable, host, command, application}").
fn build_resolver(
    checkable_id: &CheckableId,
    host_vars: &VarsBag,
    notification_name: &str,
    command: &str,
    user: &User,
    notification_type: NotificationType,
) -> Resolver {
    let mut map = BTreeMap::new();
    map.insert("user.name".to_string(), MacroValue::String(user.name.clone()));
    map.insert(
        "user.channels".to_string(),
        MacroValue::Array(user.channels.iter().map(|c| MacroValue::String(c.clone())).collect()),
    );
    map.insert("notification.name".to_string(), MacroValue::String(notification_name.to_string()));
    map.insert("notification.command".to_string(), MacroValue::String(command.to_string()));
    map.insert("notification.type".to_string(), MacroValue::String(notification_type_name(notification_type).to_string()));
    map.insert("host.name".to_string(), MacroValue::String(checkable_id.host_name().to_string()));
    if let Some(service) = checkable_id.service_name() {
        map.insert("service.name".to_string(), MacroValue::String(service.to_string()));
    }

    let scopes: Vec<Box<dyn MacroScope>> = vec![Box::new(MapScope(map)), Box::new(VarsScope(host_vars.clone()))];
    Resolver::new(scopes)
}

fn notification_type_name(ty: NotificationType) -> &'static str {
    match ty {
        NotificationType::DowntimeStart => "DowntimeStart",
        NotificationType::DowntimeEnd => "DowntimeEnd",
        NotificationType::DowntimeRemoved => "DowntimeRemoved",
        NotificationType::Custom => "Custom",
        NotificationType::Acknowledgement => "Acknowledgement",
        NotificationType::Problem => "Problem",
        NotificationType::Recovery => "Recovery",
        NotificationType::FlappingStart => "FlappingStart",
        NotificationType::FlappingEnd => "FlappingEnd",
    }
}

#[allow(dead_code)]
fn state_name(state: CurrentState) -> &'static str {
    use clustermon_types::checkable::{HostState, ServiceState};
    match state {
        CurrentState::Host(HostState::Up) => "UP",
        CurrentState::Host(HostState::Down) => "DOWN",
        CurrentState::Service(ServiceState::Ok) => "OK",
        CurrentState::Service(ServiceState::Warning) => "WARNING",
        CurrentState::Service(ServiceState::Critical) => "CRITICAL",
        CurrentState::Service(ServiceState::Unknown) => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_types::{Checkable, Notification, NotificationId, StateFilter, TypeFilter};

    fn sample_notification(checkable: CheckableId) -> Notification {
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
            times: clustermon_types::notification::EscalationTimes { begin: None, end: None },
            last_notification: 0.0,
            last_problem_notification: 0.0,
            next_notification: 0.0,
            notification_number: 0,
        }
    }

    fn sample_user(name: &str) -> User {
        User {
            name: name.into(),
            period: None,
            state_filter: StateFilter::ALL,
            type_filter: TypeFilter::ALL,
            enable_notifications: true,
            channels: vec!["mail".into()],
        }
    }

    #[test]
    fn problem_notification_fans_out_and_advances_number() {
        let store = Store::new();
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        let id = host.id.clone();
        store.insert_checkable(host);
        store.insert_user(sample_user("alice"));

        let nid = NotificationId { checkable: id.clone(), name: "mail-host".into() };
        store.insert_notification(nid.clone(), sample_notification(id.clone()));

        let store = std::sync::Arc::new(store);
        let rx = store.bus.subscribe();
        let executor = crate::executor::NotifyExecutor::new(1, store.clone());

        send_notifications(&store, &clustermon_types::AlwaysInside, &executor, &id, NotificationType::Problem, 100.0);
        let store_arc = store;

        let n = store_arc.get_notification(&nid).unwrap();
        assert_eq!(n.lock().notification_number, 1);
        assert_eq!(n.lock().last_notification, 100.0);

        let mut saw_sent_to_all = false;
        while let Ok(ev) = rx.recv_timeout(Duration::from_secs(2)) {
            if let StoreEvent::NotificationSentToAllUsers { users, .. } = ev {
                assert_eq!(users, vec!["alice".to_string()]);
                saw_sent_to_all = true;
                break;
            }
        }
        assert!(saw_sent_to_all);
    }

    #[test]
    fn recovery_resets_number_without_fan_out_gating() {
        let store = std::sync::Arc::new(Store::new());
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        let id = host.id.clone();
        store.insert_checkable(host);
        store.insert_user(sample_user("alice"));

        let nid = NotificationId { checkable: id.clone(), name: "mail-host".into() };
        let mut notification = sample_notification(id.clone());
        notification.notification_number = 3;
        store.insert_notification(nid.clone(), notification);

        let executor = crate::executor::NotifyExecutor::new(1, store.clone());
        send_notifications(&store, &clustermon_types::AlwaysInside, &executor, &id, NotificationType::Recovery, 100.0);

        let n = store.get_notification(&nid).unwrap();
        assert_eq!(n.lock().notification_number, 0);
    }
}
