//! The Checkable state machine (spec §4.4).

use clustermon_types::checkable::{AckKind, CurrentState, StateType};
use clustermon_types::dependency::DependencyPurpose;
use clustermon_types::{CheckResult, CheckableId, NotificationType, TimePeriodRegistry};
use clustermon_store::{ClusterFeature, Store, StoreEvent};

use crate::flap::{self, FlapTransition};
use crate::reachability::is_reachable;

/// Configuration the engine needs that isn't part of the per-object data
/// model (spec §4.4, §4.9): global toggles that apply across all
/// checkables.
#[derive(Debug, Clone, Copy)]
pub struct GlobalFlags {
    pub enable_flapping: bool,
    pub enable_notifications: bool,
}

impl Default for GlobalFlags {
    fn default() -> Self {
        GlobalFlags {
            enable_flapping: true,
            enable_notifications: true,
        }
    }
}

/// Outcome summary, mainly useful for tests; the authoritative record of
/// what happened is the sequence of [`StoreEvent`]s published to the bus.
#[derive(Debug, Default, Clone)]
pub struct Outcome {
    pub state_changed: bool,
    pub became_hard: bool,
    pub flap_transition: Option<FlapTransition>,
    pub notification_requested: Option<NotificationType>,
    pub downtime_triggered: Option<String>,
    pub ack_cleared: bool,
}

/// Process one CheckResult against a Checkable, applying spec §4.4 steps
/// 1-5 and publishing the resulting events. `authority` is this node's own
/// identity, stamped onto any Relay event so peers can suppress re-echo.
pub fn process_check_result(
    store: &Store,
    id: &CheckableId,
    mut result: CheckResult,
    periods: &dyn TimePeriodRegistry,
    globals: GlobalFlags,
    authority: &str,
    now: f64,
) -> Option<Outcome> {
    let handle = store.get_checkable(id)?;
    let mut outcome = Outcome::default();

    // Idempotent results (identical before/after snapshot) are a no-op:
    // no state-change event, no notification (spec §8).
    if result.is_idempotent() {
        return Some(outcome);
    }

    let reachable_for_notify;
    let mut relay_events = Vec::new();
    let mut bus_events = Vec::new();

    {
        let mut c = handle.lock();

        let reachable_for_checks = is_reachable(store, &c, DependencyPurpose::CheckExecution, periods, now);

        let s_prev = c.current_state;
        let t_prev = c.state_type;
        let a_prev = c.attempt;
        let m = c.max_check_attempts;

        let s_new = CurrentState::from_exit_status(c.kind, result.exit_status);

        let (new_state, new_type, new_attempt) = if s_new.is_ok() {
            (s_new, StateType::Hard, 1)
        } else if s_prev.is_ok() {
            (s_new, StateType::Soft, 1)
        } else if a_prev < m {
            (s_new, StateType::Soft, a_prev + 1)
        } else {
            (s_new, StateType::Hard, m)
        };

        let state_value_changed = s_prev.filter_bit() != new_state.filter_bit();
        let became_hard = new_type == StateType::Hard && (t_prev != StateType::Hard || state_value_changed);
        let is_recovery = new_type == StateType::Hard && new_state.is_ok() && !(t_prev == StateType::Hard && s_prev.is_ok());
        let is_hard_problem = became_hard && !new_state.is_ok();

        c.current_state = new_state;
        c.state_type = new_type;
        c.attempt = new_attempt;
        if state_value_changed {
            c.last_state_change = now;
        }
        if became_hard {
            c.last_hard_state_change = now;
        }

        // §4.9 flap window: counters accumulate on every processed result
        // regardless of whether flapping detection is enabled; only the
        // resulting is_flapping determination is gated.
        let flapping_enabled = globals.enable_flapping && c.enable_flapping;
        let transition = flap::update(&mut c.flapping, state_value_changed, c.flap_threshold, flapping_enabled, now);
        outcome.flap_transition = Some(transition);
        match transition {
            FlapTransition::Started => bus_events.push(StoreEvent::FlappingStart { checkable: id.clone() }),
            FlapTransition::Stopped => bus_events.push(StoreEvent::FlappingStop { checkable: id.clone() }),
            FlapTransition::None => {}
        }

        // Acknowledgement clearing: reaching OK/Up (always Hard) clears
        // both Normal and Sticky acks; a non-zero expiry is handled by
        // the periodic sweep, not here.
        if new_state.is_ok() && !matches!(c.acknowledgement.kind, AckKind::None) {
            c.acknowledgement.kind = AckKind::None;
            outcome.ack_cleared = true;
            bus_events.push(StoreEvent::AcknowledgementCleared { checkable: id.clone() });
        }

        // Flexible downtime trigger attempted on every transition into a
        // non-OK hard state, for every eligible downtime on the checkable,
        // not just the first (spec §4.4).
        if is_hard_problem {
            for dt in c.downtimes.values_mut() {
                if dt.try_trigger(now) {
                    dt.recompute_active(now);
                    outcome.downtime_triggered = Some(dt.id.clone());
                    bus_events.push(StoreEvent::DowntimeTriggered {
                        checkable: id.clone(),
                        downtime_id: dt.id.clone(),
                    });
                }
            }
        }
        for dt in c.downtimes.values_mut() {
            dt.recompute_active(now);
        }

        outcome.state_changed = state_value_changed || t_prev != new_type;
        outcome.became_hard = became_hard;

        result.vars_after = Some(clustermon_types::VarsSnapshot {
            state: new_state,
            state_type: new_type,
            attempt: new_attempt,
            reachable: reachable_for_checks,
        });
        c.last_check_result = Some(result.clone());

        bus_events.push(StoreEvent::StateChange {
            checkable: id.clone(),
            old_state_bit: s_prev.filter_bit(),
            new_state_bit: new_state.filter_bit(),
            old_hard: t_prev == StateType::Hard,
            new_hard: new_type == StateType::Hard,
        });

        relay_events.push(StoreEvent::Relay {
            method: "cluster::CheckResult".to_string(),
            params: serde_json::json!({ "checkable": id.to_string(), "exit_status": result.exit_status }),
            authority: authority.to_string(),
            persistent: true,
            security: None,
            destination: None,
        });

        reachable_for_notify = is_reachable(store, &c, DependencyPurpose::Notification, periods, now);
        drop(c);

        if is_recovery {
            for (_, nh) in store.notifications_for(id) {
                nh.lock().reset_number();
            }
            if reachable_for_notify {
                outcome.notification_requested = Some(NotificationType::Recovery);
                bus_events.push(StoreEvent::NotificationRequest {
                    checkable: id.clone(),
                    notification_type: NotificationType::Recovery,
                    result: Box::new(result.clone()),
                    author: String::new(),
                    text: String::new(),
                });
            }
        } else if is_hard_problem && reachable_for_notify {
            outcome.notification_requested = Some(NotificationType::Problem);
            bus_events.push(StoreEvent::NotificationRequest {
                checkable: id.clone(),
                notification_type: NotificationType::Problem,
                result: Box::new(result.clone()),
                author: String::new(),
                text: String::new(),
            });
        }
    }

    for ev in bus_events.into_iter().chain(relay_events.into_iter()) {
        store.bus.publish(ev);
    }

    Some(outcome)
}

/// A checkable is gated from active execution (spec §3) iff any of:
/// active checks disabled (locally or globally), the check period
/// excludes now, a CheckExecution dependency fails, or it's not yet due.
pub fn is_check_gated(
    store: &Store,
    checkable: &clustermon_types::Checkable,
    periods: &dyn TimePeriodRegistry,
    global_active_checks_enabled: bool,
    now: f64,
) -> bool {
    if !global_active_checks_enabled || !checkable.active_checks_enabled {
        return true;
    }
    if !periods.is_inside(&checkable.check_period, now) {
        return true;
    }
    if !is_reachable(store, checkable, DependencyPurpose::CheckExecution, periods, now) {
        return true;
    }
    if !checkable.force_next_check && checkable.next_check > now {
        return true;
    }
    false
}

/// 60-second sweep that garbage-collects expired downtimes and forces
/// acknowledgement expiry (spec §3, §4.4). `expiry == 0` never expires.
pub fn sweep_downtimes_and_acks(store: &Store, now: f64) {
    for handle in store.all_checkables() {
        let mut c = handle.lock();
        let id = c.id.clone();

        let expired: Vec<String> = c
            .downtimes
            .iter()
            .filter(|(_, d)| d.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            c.downtimes.remove(&key);
            drop(c);
            store.bus.publish(StoreEvent::DowntimeRemoved {
                checkable: id.clone(),
                downtime_id: key,
            });
            c = handle.lock();
        }

        if c.acknowledgement.expiry > 0.0 && now > c.acknowledgement.expiry && !matches!(c.acknowledgement.kind, AckKind::None) {
            c.acknowledgement.kind = AckKind::None;
            drop(c);
            store.bus.publish(StoreEvent::AcknowledgementCleared { checkable: id.clone() });
        }
    }
}

/// Re-election helper: notify the bus of an authority change for a single
/// (object, feature) pair (called by the cluster layer; kept here so the
/// event shape lives next to the rest of the state machine's vocabulary).
pub fn emit_authority_change(store: &Store, id: &CheckableId, feature: ClusterFeature, owner: Option<String>, gained: bool) {
    store.bus.publish(StoreEvent::AuthorityChanged {
        checkable: id.clone(),
        feature,
        owner,
        gained,
    });
}
