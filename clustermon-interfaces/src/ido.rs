//! IDO sink (spec §6): the core emits typed query events; the sink
//! translates them into SQL without the core knowing the schema.

use std::collections::BTreeMap;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdoQueryKind {
    Insert,
    Update,
    Delete,
    InsertOrUpdate,
}

#[derive(Debug, Clone)]
pub struct IdoEvent {
    pub table: String,
    pub kind: IdoQueryKind,
    pub fields: BTreeMap<String, String>,
    pub where_criteria: BTreeMap<String, String>,
    pub category: String,
    pub object_reference: String,
}

/// A program-status heartbeat query (spec §6: "fires every 10s").
#[derive(Debug, Clone)]
pub struct IdoHeartbeat {
    pub pid: u32,
    pub program_start: f64,
    pub active_checks_enabled: bool,
    pub notifications_enabled: bool,
    pub check_count: i64,
    pub notification_count: i64,
}

pub trait IdoSink: Send + Sync {
    fn emit(&self, event: IdoEvent);
    fn heartbeat(&self, hb: IdoHeartbeat);
}

/// An in-memory sink for tests: records every event it receives in order.
#[derive(Default)]
pub struct RecordingIdoSink {
    events: Mutex<Vec<IdoEvent>>,
    heartbeats: Mutex<Vec<IdoHeartbeat>>,
}

impl RecordingIdoSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IdoEvent> {
        self.events.lock().clone()
    }

    pub fn heartbeats(&self) -> Vec<IdoHeartbeat> {
        self.heartbeats.lock().clone()
    }
}

impl IdoSink for RecordingIdoSink {
    fn emit(&self, event: IdoEvent) {
        self.events.lock().push(event);
    }

    fn heartbeat(&self, hb: IdoHeartbeat) {
        self.heartbeats.lock().push(hb);
    }
}

/// The SQL writer itself is out of scope (spec.md §1); this discards
/// everything, useful when a deployment has no IDO database configured.
pub struct NullIdoSink;

impl IdoSink for NullIdoSink {
    fn emit(&self, _event: IdoEvent) {}
    fn heartbeat(&self, _hb: IdoHeartbeat) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_preserves_order() {
        let sink = RecordingIdoSink::new();
        sink.emit(IdoEvent {
            table: "icinga_statehistory".to_string(),
            kind: IdoQueryKind::Insert,
            fields: BTreeMap::new(),
            where_criteria: BTreeMap::new(),
            category: "state-change".to_string(),
            object_reference: "web1".to_string(),
        });
        sink.heartbeat(IdoHeartbeat {
            pid: 1,
            program_start: 0.0,
            active_checks_enabled: true,
            notifications_enabled: true,
            check_count: 0,
            notification_count: 0,
        });
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.heartbeats().len(), 1);
    }

    #[test]
    fn null_sink_discards_without_panicking() {
        let sink = NullIdoSink;
        sink.emit(IdoEvent {
            table: "x".to_string(),
            kind: IdoQueryKind::Delete,
            fields: BTreeMap::new(),
            where_criteria: BTreeMap::new(),
            category: "x".to_string(),
            object_reference: "x".to_string(),
        });
    }
}
