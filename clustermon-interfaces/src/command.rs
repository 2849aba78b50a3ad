//! External command ingestion (spec §4.8, §6): a separate event stream of
//! `(timestamp, verb, argv)` triples dispatched through a verb registry.
//! Every verb accessible via cluster replication is exposed here too, so
//! an external command and the equivalent programmatic mutation emit the
//! same events and therefore replicate identically.

use std::collections::BTreeMap;
use std::sync::Arc;

use clustermon_store::{Store, StoreEvent};
use clustermon_types::check_result::{CheckResult, CheckSource};
use clustermon_types::{CheckableId, Comment, Downtime, MacroValue, NotificationType};

use crate::error::InterfaceError;
use crate::status::ProgramStatus;

/// One parsed line of the external-command pipe.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCommand {
    pub ts: f64,
    pub verb: String,
    pub argv: Vec<String>,
}

/// Parse one line of the form `[<unix-ts>] <VERB>;<arg>;<arg>;…`
/// (spec §6). Malformed lines are the caller's concern to log and
/// discard; this just reports why.
pub fn parse_line(line: &str) -> Result<ExternalCommand, InterfaceError> {
    let line = line.trim();
    let rest = line
        .strip_prefix('[')
        .ok_or_else(|| malformed(line))?;
    let (ts_str, rest) = rest.split_once(']').ok_or_else(|| malformed(line))?;
    let ts: f64 = ts_str.trim().parse().map_err(|_| malformed(line))?;

    let mut fields = rest.trim_start().split(';');
    let verb = fields.next().ok_or_else(|| malformed(line))?.to_string();
    if verb.is_empty() {
        return Err(malformed(line));
    }
    let argv = fields.map(str::to_string).collect();
    Ok(ExternalCommand { ts, verb, argv })
}

fn malformed(line: &str) -> InterfaceError {
    InterfaceError::InvalidArgument {
        verb: "<parse>".to_string(),
        detail: format!("malformed external command line: {line:?}"),
    }
}

/// `host` or `host!service` (Icinga's on-the-wire checkable naming) to a
/// [`CheckableId`].
fn parse_target(s: &str) -> CheckableId {
    match s.split_once('!') {
        Some((host, service)) => CheckableId::service(host, service),
        None => CheckableId::host(s),
    }
}

type VerbHandler = dyn Fn(&Store, &ProgramStatus, &[String], f64) -> Result<(), InterfaceError> + Send + Sync;

struct VerbSpec {
    min_argc: usize,
    max_argc: usize,
    handler: Arc<VerbHandler>,
}

/// Maps verb → {callback, min_argc, max_argc} (spec §4.8).
pub struct CommandRegistry {
    verbs: BTreeMap<String, VerbSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        CommandRegistry { verbs: BTreeMap::new() }
    }

    pub fn register(
        &mut self,
        verb: impl Into<String>,
        min_argc: usize,
        max_argc: usize,
        handler: impl Fn(&Store, &ProgramStatus, &[String], f64) -> Result<(), InterfaceError> + Send + Sync + 'static,
    ) {
        self.verbs.insert(verb.into(), VerbSpec { min_argc, max_argc, handler: Arc::new(handler) });
    }

    /// Validate argument count and target existence, then invoke the verb's
    /// callback. Unknown verbs are reported as an error for the caller to
    /// log and discard (spec §6: "not reported as failed" refers to the
    /// pipe itself, not to this per-command validation).
    pub fn dispatch(&self, store: &Store, status: &ProgramStatus, cmd: &ExternalCommand) -> Result<(), InterfaceError> {
        let spec = self.verbs.get(&cmd.verb).ok_or_else(|| InterfaceError::UnknownVerb(cmd.verb.clone()))?;
        if cmd.argv.len() < spec.min_argc || cmd.argv.len() > spec.max_argc {
            return Err(InterfaceError::ArgCount {
                verb: cmd.verb.clone(),
                min: spec.min_argc,
                max: spec.max_argc,
                got: cmd.argv.len(),
            });
        }
        (spec.handler)(store, status, &cmd.argv, cmd.ts)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut reg = Self::new();
        register_core_verbs(&mut reg);
        reg
    }
}

fn target_handle(store: &Store, verb: &str, arg: &str) -> Result<clustermon_store::Handle<clustermon_types::Checkable>, InterfaceError> {
    let id = parse_target(arg);
    store.get_checkable(&id).ok_or_else(|| InterfaceError::TargetNotFound(format!("{verb}: {id}")))
}

fn parse_f64(verb: &str, arg: &str) -> Result<f64, InterfaceError> {
    arg.parse().map_err(|_| InterfaceError::InvalidArgument { verb: verb.to_string(), detail: format!("not a number: {arg}") })
}

fn parse_bool01(verb: &str, arg: &str) -> Result<bool, InterfaceError> {
    match arg {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(InterfaceError::InvalidArgument { verb: verb.to_string(), detail: format!("expected 0 or 1: {other}") }),
    }
}

fn relay(store: &Store, method: &str, params: serde_json::Value) {
    store.bus.publish(StoreEvent::Relay {
        method: method.to_string(),
        params,
        authority: "self".to_string(),
        persistent: true,
        security: None,
        destination: None,
    });
}

fn register_core_verbs(reg: &mut CommandRegistry) {
    // --- Rescheduling ---
    reg.register("SCHEDULE_FORCED_CHECK", 2, 2, |store, _status, argv, _ts| {
        let handle = target_handle(store, "SCHEDULE_FORCED_CHECK", &argv[0])?;
        let next_check = parse_f64("SCHEDULE_FORCED_CHECK", &argv[1])?;
        {
            let mut c = handle.lock();
            c.next_check = next_check;
            c.force_next_check = true;
        }
        relay(store, "SetNextCheck", serde_json::json!({ "checkable": parse_target(&argv[0]), "next_check": next_check }));
        relay(store, "SetForceNextCheck", serde_json::json!({ "checkable": parse_target(&argv[0]), "forced": true }));
        Ok(())
    });

    // --- Downtimes ---
    reg.register("SCHEDULE_DOWNTIME", 7, 7, |store, _status, argv, ts| {
        let handle = target_handle(store, "SCHEDULE_DOWNTIME", &argv[0])?;
        let author = argv[1].clone();
        let comment = argv[2].clone();
        let start = parse_f64("SCHEDULE_DOWNTIME", &argv[3])?;
        let end = parse_f64("SCHEDULE_DOWNTIME", &argv[4])?;
        let fixed = parse_bool01("SCHEDULE_DOWNTIME", &argv[5])?;
        let duration = parse_f64("SCHEDULE_DOWNTIME", &argv[6])?;

        let downtime = Downtime {
            id: uuid_like(&argv[0], ts),
            legacy_numeric_id: ts as u64,
            author,
            comment,
            entry_time: ts,
            start_time: start,
            end_time: end,
            fixed,
            duration,
            triggered_by_id: None,
            trigger_time: None,
            is_active: false,
            was_cancelled: false,
            scheduled_by: "external-command".to_string(),
        };
        let id = downtime.id.clone();
        handle.lock().downtimes.insert(id.clone(), downtime.clone());
        store.bus.publish(StoreEvent::DowntimeAdded { checkable: parse_target(&argv[0]), downtime_id: id });
        relay(
            store,
            "AddDowntime",
            serde_json::json!({ "checkable": parse_target(&argv[0]), "downtime": downtime }),
        );
        Ok(())
    });

    reg.register("DEL_DOWNTIME", 2, 2, |store, _status, argv, _ts| {
        let handle = target_handle(store, "DEL_DOWNTIME", &argv[0])?;
        let downtime_id = argv[1].clone();
        let removed = handle.lock().downtimes.remove(&downtime_id).is_some();
        if !removed {
            return Err(InterfaceError::TargetNotFound(format!("downtime {downtime_id}")));
        }
        store.bus.publish(StoreEvent::DowntimeRemoved { checkable: parse_target(&argv[0]), downtime_id: downtime_id.clone() });
        relay(store, "RemoveDowntime", serde_json::json!({ "checkable": parse_target(&argv[0]), "id": downtime_id }));
        Ok(())
    });

    // --- Comments ---
    reg.register("ADD_COMMENT", 3, 3, |store, _status, argv, ts| {
        let handle = target_handle(store, "ADD_COMMENT", &argv[0])?;
        let comment = Comment {
            id: uuid_like(&argv[0], ts),
            legacy_numeric_id: ts as u64,
            author: argv[1].clone(),
            text: argv[2].clone(),
            entry_time: ts,
            entry_type: clustermon_types::comment::CommentEntryType::User,
            expire_time: 0.0,
        };
        let id = comment.id.clone();
        handle.lock().comments.insert(id.clone(), comment.clone());
        store.bus.publish(StoreEvent::CommentAdded { checkable: parse_target(&argv[0]), comment_id: id });
        relay(store, "AddComment", serde_json::json!({ "checkable": parse_target(&argv[0]), "comment": comment }));
        Ok(())
    });

    reg.register("DEL_COMMENT", 2, 2, |store, _status, argv, _ts| {
        let handle = target_handle(store, "DEL_COMMENT", &argv[0])?;
        let comment_id = argv[1].clone();
        let removed = handle.lock().comments.remove(&comment_id).is_some();
        if !removed {
            return Err(InterfaceError::TargetNotFound(format!("comment {comment_id}")));
        }
        store.bus.publish(StoreEvent::CommentRemoved { checkable: parse_target(&argv[0]), comment_id: comment_id.clone() });
        relay(store, "RemoveComment", serde_json::json!({ "checkable": parse_target(&argv[0]), "id": comment_id }));
        Ok(())
    });

    // --- Acknowledgements ---
    reg.register("ACKNOWLEDGE_PROBLEM", 5, 5, |store, _status, argv, _ts| {
        let handle = target_handle(store, "ACKNOWLEDGE_PROBLEM", &argv[0])?;
        let sticky = parse_bool01("ACKNOWLEDGE_PROBLEM", &argv[1])?;
        let author = argv[2].clone();
        let comment = argv[3].clone();
        let expiry = parse_f64("ACKNOWLEDGE_PROBLEM", &argv[4])?;
        handle.lock().acknowledgement = clustermon_types::checkable::Acknowledgement {
            kind: if sticky { clustermon_types::checkable::AckKind::Sticky } else { clustermon_types::checkable::AckKind::Normal },
            author: author.clone(),
            comment: comment.clone(),
            expiry,
        };
        store.bus.publish(StoreEvent::AcknowledgementSet { checkable: parse_target(&argv[0]) });
        relay(
            store,
            "SetAcknowledgement",
            serde_json::json!({ "checkable": parse_target(&argv[0]), "type": if sticky { "sticky" } else { "normal" }, "author": author, "comment": comment, "expiry": expiry }),
        );
        Ok(())
    });

    reg.register("REMOVE_ACKNOWLEDGEMENT", 1, 1, |store, _status, argv, _ts| {
        let handle = target_handle(store, "REMOVE_ACKNOWLEDGEMENT", &argv[0])?;
        handle.lock().acknowledgement = clustermon_types::checkable::Acknowledgement::default();
        store.bus.publish(StoreEvent::AcknowledgementCleared { checkable: parse_target(&argv[0]) });
        relay(store, "ClearAcknowledgement", serde_json::json!({ "checkable": parse_target(&argv[0]) }));
        Ok(())
    });

    // --- Custom notifications ---
    reg.register("SEND_CUSTOM_NOTIFICATION", 3, 3, |store, _status, argv, ts| {
        let handle = target_handle(store, "SEND_CUSTOM_NOTIFICATION", &argv[0])?;
        let author = argv[1].clone();
        let text = argv[2].clone();
        let result = {
            let c = handle.lock();
            c.last_check_result.clone().unwrap_or_else(|| synthetic_result(ts))
        };
        store.bus.publish(StoreEvent::NotificationRequest {
            checkable: parse_target(&argv[0]),
            notification_type: NotificationType::Custom,
            result: Box::new(result),
            author,
            text,
        });
        Ok(())
    });

    // --- Per-checkable attribute mutation ---
    reg.register("CHANGE_CHECK_INTERVAL", 2, 2, |store, _status, argv, _ts| {
        let handle = target_handle(store, "CHANGE_CHECK_INTERVAL", &argv[0])?;
        handle.lock().check_interval = parse_f64("CHANGE_CHECK_INTERVAL", &argv[1])?;
        Ok(())
    });

    reg.register("CHANGE_MAX_CHECK_ATTEMPTS", 2, 2, |store, _status, argv, _ts| {
        let handle = target_handle(store, "CHANGE_MAX_CHECK_ATTEMPTS", &argv[0])?;
        let attempts: u32 = argv[1]
            .parse()
            .map_err(|_| InterfaceError::InvalidArgument { verb: "CHANGE_MAX_CHECK_ATTEMPTS".to_string(), detail: argv[1].clone() })?;
        handle.lock().max_check_attempts = attempts;
        Ok(())
    });

    reg.register("CHANGE_CHECK_PERIOD", 2, 2, |store, _status, argv, _ts| {
        let handle = target_handle(store, "CHANGE_CHECK_PERIOD", &argv[0])?;
        handle.lock().check_period = Some(argv[1].clone());
        Ok(())
    });

    reg.register("CHANGE_CUSTOM_VAR", 3, 3, |store, _status, argv, _ts| {
        let handle = target_handle(store, "CHANGE_CUSTOM_VAR", &argv[0])?;
        handle.lock().vars.set(argv[1].clone(), MacroValue::String(argv[2].clone()));
        Ok(())
    });

    // --- Global toggles (spec §4.8: "enabling/disabling features globally") ---
    reg.register("ENABLE_NOTIFICATIONS", 0, 0, |_store, status, _argv, _ts| {
        status.set_notifications_enabled(true);
        Ok(())
    });
    reg.register("DISABLE_NOTIFICATIONS", 0, 0, |_store, status, _argv, _ts| {
        status.set_notifications_enabled(false);
        Ok(())
    });
    reg.register("ENABLE_FLAP_DETECTION", 0, 0, |_store, status, _argv, _ts| {
        status.set_flap_detection_enabled(true);
        Ok(())
    });
    reg.register("DISABLE_FLAP_DETECTION", 0, 0, |_store, status, _argv, _ts| {
        status.set_flap_detection_enabled(false);
        Ok(())
    });
    reg.register("ENABLE_EVENT_HANDLERS", 0, 0, |_store, status, _argv, _ts| {
        status.set_event_handlers_enabled(true);
        Ok(())
    });
    reg.register("DISABLE_EVENT_HANDLERS", 0, 0, |_store, status, _argv, _ts| {
        status.set_event_handlers_enabled(false);
        Ok(())
    });
    reg.register("ENABLE_PERFORMANCE_DATA", 0, 0, |_store, status, _argv, _ts| {
        status.set_performance_data_enabled(true);
        Ok(())
    });
    reg.register("DISABLE_PERFORMANCE_DATA", 0, 0, |_store, status, _argv, _ts| {
        status.set_performance_data_enabled(false);
        Ok(())
    });
    reg.register("ENABLE_ACTIVE_CHECKS", 0, 0, |_store, status, _argv, _ts| {
        status.set_active_checks_enabled(true);
        Ok(())
    });
    reg.register("DISABLE_ACTIVE_CHECKS", 0, 0, |_store, status, _argv, _ts| {
        status.set_active_checks_enabled(false);
        Ok(())
    });
}

fn synthetic_result(ts: f64) -> CheckResult {
    CheckResult {
        schedule_start: ts,
        schedule_end: ts,
        execution_start: ts,
        execution_end: ts,
        exit_status: 0,
        output: String::new(),
        long_output: String::new(),
        perfdata: Vec::new(),
        check_source: CheckSource::Local("external-command".to_string()),
        active: false,
        vars_before: None,
        vars_after: None,
    }
}

/// A cheap, collision-resistant-enough-for-test-fixtures id derived from
/// the target and timestamp; real deployments would use a uuid crate, but
/// nothing in the workspace currently pulls one in for this single use.
fn uuid_like(target: &str, ts: f64) -> String {
    format!("{target}-{ts}")
}
