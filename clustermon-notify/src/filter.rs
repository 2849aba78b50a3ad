//! Per-notification and per-user filter evaluation (spec §4.5 steps 1-5,
//! step 8).

use clustermon_types::checkable::CurrentState;
use clustermon_types::{Checkable, Notification, NotificationType, TimePeriodRegistry, User};

/// Whether `notification` should even be considered right now, ignoring
/// the checkable-wide suppressions (flapping/downtime/ack) handled
/// separately in [`crate::dispatch`].
pub fn admits(notification: &Notification, current_state: CurrentState, notification_type: NotificationType, last_hard_state_change: f64, periods: &dyn TimePeriodRegistry, now: f64, forced: bool) -> bool {
    if !forced && !periods.is_inside(&notification.period, now) {
        return false;
    }

    if notification_type == NotificationType::Problem {
        if let Some(begin) = notification.times.begin {
            if now < last_hard_state_change + begin {
                return false;
            }
        }
        if let Some(end) = notification.times.end {
            if now > last_hard_state_change + end {
                return false;
            }
        }
    }

    if !notification.type_filter.matches(notification_type) {
        return false;
    }

    if !notification.state_filter.matches(current_state.filter_bit()) {
        return false;
    }

    true
}

/// Per-user re-evaluation (spec §4.5 step 8): a user can further narrow
/// what they're notified about.
pub fn user_admits(user: &User, current_state: CurrentState, notification_type: NotificationType, periods: &dyn TimePeriodRegistry, now: f64) -> bool {
    if !user.enable_notifications {
        return false;
    }
    if !periods.is_inside(&user.period, now) {
        return false;
    }
    if !user.type_filter.matches(notification_type) {
        return false;
    }
    if !user.state_filter.matches(current_state.filter_bit()) {
        return false;
    }
    true
}

/// Checkable-wide suppression (spec §4.4): flapping suppresses
/// everything except Flapping*/Custom/Acknowledgement; downtime
/// suppresses Problem/Recovery/Flapping but not the downtime-lifecycle
/// or Custom/Acknowledgement types; an active acknowledgement suppresses
/// Problem only.
pub fn suppressed_by_checkable_state(checkable: &Checkable, notification_type: NotificationType) -> bool {
    use NotificationType::*;

    if !checkable.notifications_enabled {
        return true;
    }

    if checkable.flapping.is_flapping
        && !clustermon_types::TypeFilter::non_suppressible_during_flapping().matches(notification_type)
    {
        return true;
    }

    if checkable.in_downtime() && matches!(notification_type, Problem | Recovery | FlappingStart | FlappingEnd) {
        return true;
    }

    if checkable.is_acknowledged() && matches!(notification_type, Problem) {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_types::checkable::{CommandLine, HostState};
    use clustermon_types::notification::EscalationTimes;
    use clustermon_types::{AlwaysInside, StateFilter, TypeFilter};

    fn base_notification() -> Notification {
        Notification {
            name: "n".into(),
            parent: clustermon_types::CheckableId::host("web1"),
            command: "notify-host".into(),
            users: vec![],
            user_groups: vec![],
            period: None,
            state_filter: StateFilter::ALL,
            type_filter: TypeFilter::ALL,
            interval: 1800.0,
            times: EscalationTimes { begin: None, end: None },
            last_notification: 0.0,
            last_problem_notification: 0.0,
            next_notification: 0.0,
            notification_number: 0,
        }
    }

    #[test]
    fn escalation_window_gates_problem_notifications() {
        let mut n = base_notification();
        n.times = EscalationTimes { begin: Some(300.0), end: Some(1800.0) };
        let state = CurrentState::Host(HostState::Down);

        assert!(!admits(&n, state, NotificationType::Problem, 1000.0, &AlwaysInside, 1100.0, false));
        assert!(admits(&n, state, NotificationType::Problem, 1000.0, &AlwaysInside, 1400.0, false));
        assert!(!admits(&n, state, NotificationType::Problem, 1000.0, &AlwaysInside, 3000.0, false));
    }

    #[test]
    fn forced_notification_ignores_period() {
        let n = base_notification();
        let state = CurrentState::Host(HostState::Down);
        assert!(admits(&n, state, NotificationType::Custom, 0.0, &AlwaysInside, 0.0, true));
    }

    #[test]
    fn flapping_suppresses_problem_but_not_flapping_start() {
        let mut host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        host.flapping.is_flapping = true;
        assert!(suppressed_by_checkable_state(&host, NotificationType::Problem));
        assert!(!suppressed_by_checkable_state(&host, NotificationType::FlappingStart));
    }

    #[test]
    fn downtime_suppresses_recovery_but_not_downtime_start() {
        let mut host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        let dt = clustermon_types::Downtime {
            id: "dt1".into(),
            legacy_numeric_id: 1,
            author: "a".into(),
            comment: "c".into(),
            entry_time: 0.0,
            start_time: 0.0,
            end_time: 100.0,
            fixed: true,
            duration: 0.0,
            triggered_by_id: None,
            trigger_time: None,
            is_active: true,
            was_cancelled: false,
            scheduled_by: "a".into(),
        };
        host.downtimes.insert(dt.id.clone(), dt);
        assert!(suppressed_by_checkable_state(&host, NotificationType::Recovery));
        assert!(!suppressed_by_checkable_state(&host, NotificationType::DowntimeStart));
    }
}
