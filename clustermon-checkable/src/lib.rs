//! The Checkable state machine: soft/hard transitions, flap detection,
//! downtime/acknowledgement gating, and dependency reachability (spec
//! §4.4, §4.9, §3).

pub mod engine;
pub mod flap;
pub mod reachability;
pub mod sweep;

pub use engine::{emit_authority_change, is_check_gated, process_check_result, GlobalFlags, Outcome};
pub use reachability::is_reachable;
pub use sweep::{spawn as spawn_sweep, SweepHandle};

#[cfg(test)]
mod scenario_tests {
    use super::*;
    use clustermon_store::{ClusterFeature, Store, StoreEvent};
    use clustermon_types::checkable::{AckKind, Acknowledgement, CommandLine};
    use clustermon_types::{CheckResult, CheckSource, Checkable, NotificationType};

    fn result(exit_status: i32) -> CheckResult {
        CheckResult {
            schedule_start: 0.0,
            schedule_end: 0.0,
            execution_start: 0.0,
            execution_end: 0.0,
            exit_status,
            output: String::new(),
            long_output: String::new(),
            perfdata: vec![],
            check_source: CheckSource::Local("test".into()),
            active: true,
            vars_before: None,
            vars_after: None,
        }
    }

    #[test]
    fn soft_to_hard_transition_after_max_attempts() {
        let store = Store::new();
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        let id = host.id.clone();
        store.insert_checkable(host);

        let rx = store.bus.subscribe();
        let globals = GlobalFlags::default();

        // 1st failure: Hard -> Soft, attempt 1.
        process_check_result(&store, &id, result(2), &clustermon_types::AlwaysInside, globals, "local", 10.0).unwrap();
        {
            let c = store.get_checkable(&id).unwrap();
            let c = c.lock();
            assert_eq!(c.attempt, 1);
            assert_eq!(c.state_type, clustermon_types::StateType::Soft);
        }

        // 2nd failure: attempt 2, still soft (max_check_attempts = 3).
        process_check_result(&store, &id, result(2), &clustermon_types::AlwaysInside, globals, "local", 20.0).unwrap();
        {
            let c = store.get_checkable(&id).unwrap();
            let c = c.lock();
            assert_eq!(c.attempt, 2);
            assert_eq!(c.state_type, clustermon_types::StateType::Soft);
        }

        // 3rd failure: attempt 3, now Hard — should request a Problem notification.
        let outcome = process_check_result(&store, &id, result(2), &clustermon_types::AlwaysInside, globals, "local", 30.0).unwrap();
        {
            let c = store.get_checkable(&id).unwrap();
            let c = c.lock();
            assert_eq!(c.attempt, 3);
            assert_eq!(c.state_type, clustermon_types::StateType::Hard);
        }
        assert_eq!(outcome.notification_requested, Some(NotificationType::Problem));

        let mut saw_problem_notification = false;
        while let Ok(ev) = rx.try_recv() {
            if let StoreEvent::NotificationRequest { notification_type, .. } = ev {
                if notification_type == NotificationType::Problem {
                    saw_problem_notification = true;
                }
            }
        }
        assert!(saw_problem_notification);
    }

    #[test]
    fn recovery_resets_notification_number_on_children() {
        let store = Store::new();
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        let id = host.id.clone();
        store.insert_checkable(host);

        let notification_id = clustermon_types::NotificationId {
            checkable: id.clone(),
            name: "mail-host".into(),
        };
        store.insert_notification(
            notification_id.clone(),
            clustermon_types::Notification {
                name: "mail-host".into(),
                parent: id.clone(),
                command: "mail-host-notifier".into(),
                users: vec!["alice".into()],
                user_groups: vec![],
                period: None,
                state_filter: clustermon_types::StateFilter::ALL,
                type_filter: clustermon_types::TypeFilter::ALL,
                interval: 1800.0,
                times: clustermon_types::notification::EscalationTimes { begin: None, end: None },
                last_notification: 0.0,
                last_problem_notification: 0.0,
                next_notification: 0.0,
                notification_number: 4,
            },
        );

        let globals = GlobalFlags::default();
        for (i, attempt_time) in [10.0, 20.0, 30.0].into_iter().enumerate() {
            process_check_result(&store, &id, result(2), &clustermon_types::AlwaysInside, globals, "local", attempt_time).unwrap();
            let _ = i;
        }
        assert_eq!(store.get_checkable(&id).unwrap().lock().state_type, clustermon_types::StateType::Hard);

        let outcome = process_check_result(&store, &id, result(0), &clustermon_types::AlwaysInside, globals, "local", 40.0).unwrap();
        assert_eq!(outcome.notification_requested, Some(NotificationType::Recovery));

        let n = store.get_notification(&notification_id).unwrap();
        assert_eq!(n.lock().notification_number, 0);
    }

    #[test]
    fn acknowledgement_is_cleared_on_recovery() {
        let store = Store::new();
        let mut host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        host.current_state = clustermon_types::checkable::CurrentState::Host(clustermon_types::checkable::HostState::Down);
        host.state_type = clustermon_types::StateType::Hard;
        host.attempt = host.max_check_attempts;
        host.acknowledgement = Acknowledgement {
            kind: AckKind::Sticky,
            author: "oncall".into(),
            comment: "known issue".into(),
            expiry: 0.0,
        };
        let id = host.id.clone();
        store.insert_checkable(host);

        let globals = GlobalFlags::default();
        let outcome = process_check_result(&store, &id, result(0), &clustermon_types::AlwaysInside, globals, "local", 100.0).unwrap();

        assert!(outcome.ack_cleared);
        assert!(matches!(
            store.get_checkable(&id).unwrap().lock().acknowledgement.kind,
            AckKind::None
        ));
    }

    #[test]
    fn authority_change_event_round_trips() {
        let store = Store::new();
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        let id = host.id.clone();
        store.insert_checkable(host);

        let rx = store.bus.subscribe();
        emit_authority_change(&store, &id, ClusterFeature::Checker, Some("node-a".into()), true);

        match rx.try_recv().unwrap() {
            StoreEvent::AuthorityChanged { checkable, feature, owner, gained } => {
                assert_eq!(checkable, id);
                assert_eq!(feature, ClusterFeature::Checker);
                assert_eq!(owner.as_deref(), Some("node-a"));
                assert!(gained);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
