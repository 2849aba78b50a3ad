//! Relay message shape and dispatch (spec §4.7): every state-changing
//! event produces a JSON-RPC-style message; receivers apply it against
//! the local store, tagging the mutation's authority as the sender so
//! the state machine suppresses re-emission and breaks the relay loop.

use clustermon_store::{Store, StoreEvent};
use clustermon_types::checkable::{AckKind, Acknowledgement};
use clustermon_types::{Comment, Downtime, NotificationId};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Security {
    pub object_type: String,
    pub object_name: String,
    pub privs: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RelayMessage {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
    pub ts: f64,
    pub security: Option<Security>,
    /// Sender identity; not part of the wire payload itself in the
    /// original protocol but threaded through locally so dispatch can tag
    /// mutations with authority = sender (spec §4.7).
    #[serde(skip)]
    pub source: String,
}

impl RelayMessage {
    pub fn new(method: impl Into<String>, params: serde_json::Value, ts: f64, source: impl Into<String>) -> Self {
        RelayMessage {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            ts,
            security: None,
            source: source.into(),
        }
    }
}

/// Apply a received relay message to the local store (spec §4.7's method
/// table). Unknown methods are logged and ignored rather than treated as
/// fatal, since a newer peer may send a method this build doesn't know.
pub fn apply(store: &Store, msg: &RelayMessage) {
    let checkable_id = |params: &serde_json::Value| -> Option<clustermon_types::CheckableId> {
        serde_json::from_value(params.get("checkable")?.clone()).ok()
    };

    match msg.method.as_str() {
        "SetNextCheck" => {
            if let (Some(id), Some(next_check)) = (checkable_id(&msg.params), msg.params.get("next_check").and_then(|v| v.as_f64())) {
                if let Some(handle) = store.get_checkable(&id) {
                    handle.lock().next_check = next_check;
                }
            }
        }
        "SetForceNextCheck" => {
            if let (Some(id), Some(forced)) = (checkable_id(&msg.params), msg.params.get("forced").and_then(|v| v.as_bool())) {
                if let Some(handle) = store.get_checkable(&id) {
                    handle.lock().force_next_check = forced;
                }
            }
        }
        "SetForceNextNotification" => {
            if let (Some(id), Some(forced)) = (checkable_id(&msg.params), msg.params.get("forced").and_then(|v| v.as_bool())) {
                if let Some(handle) = store.get_checkable(&id) {
                    handle.lock().force_next_notification = forced;
                }
            }
        }
        "SetEnableActiveChecks" => set_flag(store, msg, |c, v| c.active_checks_enabled = v),
        "SetEnablePassiveChecks" => set_flag(store, msg, |c, v| c.passive_checks_enabled = v),
        "SetEnableNotifications" => set_flag(store, msg, |c, v| c.notifications_enabled = v),
        "SetEnableFlapping" => set_enable_flapping(store, msg),
        "SetNextNotification" => {
            if let Some(name) = msg.params.get("notification").and_then(|v| v.as_str()) {
                if let Some(id) = checkable_id(&msg.params) {
                    let nid = NotificationId { checkable: id, name: name.to_string() };
                    if let Some(handle) = store.get_notification(&nid) {
                        if let Some(next) = msg.params.get("next_notification").and_then(|v| v.as_f64()) {
                            handle.lock().next_notification = next;
                        }
                    }
                }
            }
        }
        "AddComment" => {
            if let (Some(id), Ok(comment)) = (checkable_id(&msg.params), serde_json::from_value::<Comment>(msg.params.get("comment").cloned().unwrap_or_default())) {
                if let Some(handle) = store.get_checkable(&id) {
                    handle.lock().comments.insert(comment.id.clone(), comment);
                }
            }
        }
        "RemoveComment" => {
            if let (Some(id), Some(comment_id)) = (checkable_id(&msg.params), msg.params.get("id").and_then(|v| v.as_str())) {
                if let Some(handle) = store.get_checkable(&id) {
                    handle.lock().comments.remove(comment_id);
                }
            }
        }
        "AddDowntime" => {
            if let (Some(id), Ok(downtime)) = (checkable_id(&msg.params), serde_json::from_value::<Downtime>(msg.params.get("downtime").cloned().unwrap_or_default())) {
                if let Some(handle) = store.get_checkable(&id) {
                    handle.lock().downtimes.insert(downtime.id.clone(), downtime);
                }
            }
        }
        "RemoveDowntime" => {
            if let (Some(id), Some(downtime_id)) = (checkable_id(&msg.params), msg.params.get("id").and_then(|v| v.as_str())) {
                if let Some(handle) = store.get_checkable(&id) {
                    handle.lock().downtimes.remove(downtime_id);
                }
            }
        }
        "SetAcknowledgement" => {
            if let Some(id) = checkable_id(&msg.params) {
                if let Some(handle) = store.get_checkable(&id) {
                    let sticky = msg.params.get("type").and_then(|v| v.as_str()) == Some("sticky");
                    let mut c = handle.lock();
                    c.acknowledgement = Acknowledgement {
                        kind: if sticky { AckKind::Sticky } else { AckKind::Normal },
                        author: msg.params.get("author").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                        comment: msg.params.get("comment").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                        expiry: msg.params.get("expiry").and_then(|v| v.as_f64()).unwrap_or(0.0),
                    };
                }
            }
        }
        "ClearAcknowledgement" => {
            if let Some(id) = checkable_id(&msg.params) {
                if let Some(handle) = store.get_checkable(&id) {
                    handle.lock().acknowledgement = Acknowledgement::default();
                }
            }
        }
        "SetLogPosition" => {
            if let Some(endpoint) = store.get_endpoint(&msg.source) {
                if let Some(pos) = msg.params.get("log_position").and_then(|v| v.as_f64()) {
                    endpoint.lock().local_log_position = pos;
                }
            }
        }
        "HeartBeat" | "BlockLink" | "CheckResult" | "Config" => {
            // Handled upstream by the heartbeat/listener/checkable-ingestion
            // layers respectively, which need access to the live TCP
            // session or the scheduler/exec plumbing this module doesn't
            // have a handle to.
        }
        other => {
            tracing::debug!(method = other, "ignoring unrecognized relay method");
        }
    }
}

fn set_flag(store: &Store, msg: &RelayMessage, apply: impl Fn(&mut clustermon_types::Checkable, bool)) {
    let Some(id) = msg.params.get("checkable").and_then(|v| serde_json::from_value::<clustermon_types::CheckableId>(v.clone()).ok()) else {
        return;
    };
    let Some(enabled) = msg.params.get("enabled").and_then(|v| v.as_bool()) else {
        return;
    };
    if let Some(handle) = store.get_checkable(&id) {
        apply(&mut handle.lock(), enabled);
    }
}

/// Disabling flap detection from configuration emits `FlappingDisabled`
/// without touching the flap counters; enabling it is a plain flag flip
/// (spec §4.9).
fn set_enable_flapping(store: &Store, msg: &RelayMessage) {
    let Some(id) = msg.params.get("checkable").and_then(|v| serde_json::from_value::<clustermon_types::CheckableId>(v.clone()).ok()) else {
        return;
    };
    let Some(enabled) = msg.params.get("enabled").and_then(|v| v.as_bool()) else {
        return;
    };
    let Some(handle) = store.get_checkable(&id) else {
        return;
    };
    let was_enabled = {
        let mut c = handle.lock();
        let was_enabled = c.enable_flapping;
        c.enable_flapping = enabled;
        was_enabled
    };
    if was_enabled && !enabled {
        store.bus.publish(StoreEvent::FlappingDisabled { checkable: id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_types::checkable::CommandLine;
    use clustermon_types::Checkable;

    #[test]
    fn set_next_check_mutates_target() {
        let store = Store::new();
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        let id = host.id.clone();
        store.insert_checkable(host);

        let msg = RelayMessage::new(
            "SetNextCheck",
            serde_json::json!({ "checkable": id, "next_check": 500.0 }),
            0.0,
            "peer-a",
        );
        apply(&store, &msg);

        assert_eq!(store.get_checkable(&id).unwrap().lock().next_check, 500.0);
    }

    #[test]
    fn set_enable_notifications_toggles_flag() {
        let store = Store::new();
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        let id = host.id.clone();
        store.insert_checkable(host);

        let msg = RelayMessage::new(
            "SetEnableNotifications",
            serde_json::json!({ "checkable": id, "enabled": false }),
            0.0,
            "peer-a",
        );
        apply(&store, &msg);

        assert!(!store.get_checkable(&id).unwrap().lock().notifications_enabled);
    }

    #[test]
    fn disabling_flapping_emits_flapping_disabled_without_touching_counters() {
        let store = Store::new();
        let mut host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        host.flapping.positive = 42.0;
        host.flapping.negative = 7.0;
        let id = host.id.clone();
        store.insert_checkable(host);
        let rx = store.bus.subscribe();

        let msg = RelayMessage::new(
            "SetEnableFlapping",
            serde_json::json!({ "checkable": id, "enabled": false }),
            0.0,
            "peer-a",
        );
        apply(&store, &msg);

        let checkable = store.get_checkable(&id).unwrap();
        let locked = checkable.lock();
        assert!(!locked.enable_flapping);
        assert_eq!(locked.flapping.positive, 42.0);
        assert_eq!(locked.flapping.negative, 7.0);
        drop(locked);

        match rx.try_recv().unwrap() {
            StoreEvent::FlappingDisabled { checkable } => assert_eq!(checkable, id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn re_enabling_flapping_emits_no_event() {
        let store = Store::new();
        let mut host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        host.enable_flapping = false;
        let id = host.id.clone();
        store.insert_checkable(host);
        let rx = store.bus.subscribe();

        let msg = RelayMessage::new(
            "SetEnableFlapping",
            serde_json::json!({ "checkable": id, "enabled": true }),
            0.0,
            "peer-a",
        );
        apply(&store, &msg);

        assert!(store.get_checkable(&id).unwrap().lock().enable_flapping);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unknown_method_is_ignored_without_panicking() {
        let store = Store::new();
        let msg = RelayMessage::new("SomeFutureMethod", serde_json::json!({}), 0.0, "peer-a");
        apply(&store, &msg);
    }
}
