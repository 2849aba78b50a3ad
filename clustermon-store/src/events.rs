//! Typed event-bus payloads (spec §4.1).
//!
//! The source system's signal/slot bus (many ad-hoc `boost::signals2`
//! signals with per-signal subscriber lists) is collapsed here into one
//! typed enum delivered over a broadcast channel (spec §9 redesign note).
//! Emission is synchronous: [`EventBus::publish`] hands every subscriber
//! its own clone before returning. A handler that wants to do blocking
//! work enqueues to its own worker pool instead of blocking the publisher.

use clustermon_types::{CheckResult, CheckableId, NotificationId, NotificationType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterFeature {
    Checker,
    Notifications,
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    Started,
    Stopped,
    ConfigLoaded,

    /// A raw check result was accepted by the pipeline, before the state
    /// machine has processed it.
    NewCheckResult {
        checkable: CheckableId,
        result: Box<CheckResult>,
    },

    /// The state machine transitioned state and/or state_type.
    StateChange {
        checkable: CheckableId,
        old_state_bit: u32,
        new_state_bit: u32,
        old_hard: bool,
        new_hard: bool,
    },

    FlappingStart {
        checkable: CheckableId,
    },
    FlappingStop {
        checkable: CheckableId,
    },
    FlappingDisabled {
        checkable: CheckableId,
    },

    DowntimeAdded {
        checkable: CheckableId,
        downtime_id: String,
    },
    DowntimeRemoved {
        checkable: CheckableId,
        downtime_id: String,
    },
    DowntimeTriggered {
        checkable: CheckableId,
        downtime_id: String,
    },

    CommentAdded {
        checkable: CheckableId,
        comment_id: String,
    },
    CommentRemoved {
        checkable: CheckableId,
        comment_id: String,
    },

    AcknowledgementSet {
        checkable: CheckableId,
    },
    AcknowledgementCleared {
        checkable: CheckableId,
    },

    /// Emitted by the state machine; consumed by the notification engine.
    NotificationRequest {
        checkable: CheckableId,
        notification_type: NotificationType,
        result: Box<CheckResult>,
        author: String,
        text: String,
    },

    NotificationSentToUser {
        notification: NotificationId,
        user: String,
    },
    NotificationSentToAllUsers {
        notification: NotificationId,
        users: Vec<String>,
    },

    AuthorityChanged {
        checkable: CheckableId,
        feature: ClusterFeature,
        owner: Option<String>,
        gained: bool,
    },

    /// A state-changing mutation to relay to cluster peers. `authority` is
    /// the identity that originated the mutation; the cluster layer
    /// suppresses re-emission when it did not originate locally (spec §4.7).
    Relay {
        method: String,
        params: serde_json::Value,
        authority: String,
        persistent: bool,
        security: Option<RelaySecurity>,
        destination: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct RelaySecurity {
    pub object_type: String,
    pub object_name: String,
    pub privileges: u32,
}

/// A typed, multi-subscriber broadcast bus.
#[derive(Clone)]
pub struct EventBus {
    subscribers: std::sync::Arc<parking_lot::Mutex<Vec<crossbeam_channel::Sender<StoreEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            subscribers: std::sync::Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    /// Register a new subscriber; returns the receiving end of an
    /// unbounded channel dedicated to it.
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<StoreEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `event` to every current subscriber. Dead subscribers
    /// (receiver dropped) are pruned opportunistically.
    pub fn publish(&self, event: StoreEvent) {
        let mut subs = self.subscribers.lock();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
