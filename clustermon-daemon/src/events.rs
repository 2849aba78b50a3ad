//! The bus event router (spec §4.1, §4.5, §4.6, §4.7): one thread drains
//! the store's event bus and fans each event out to the subsystem that
//! owns the corresponding side effect — the scheduler/notify-sweep
//! authority maps, the notification engine, the cluster relay transport,
//! and the IDO sink.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clustermon_cluster::{RelayMessage, Transport};
use clustermon_interfaces::{IdoEvent, IdoQueryKind, IdoSink};
use clustermon_notify::send_notifications;
use clustermon_store::{Store, StoreEvent};
use clustermon_types::{AlwaysInside, TimePeriodRegistry};

use crate::authority::ClusterAuthority;
use crate::dispatch::{self, DaemonScheduler};

pub struct EventRouter<T: Transport> {
    pub store: Arc<Store>,
    pub scheduler: Arc<DaemonScheduler>,
    pub authority: Arc<ClusterAuthority>,
    pub notify_executor: Arc<clustermon_notify::NotifyExecutor>,
    pub transport: Arc<T>,
    pub ido_sink: Arc<dyn IdoSink>,
    pub identity: String,
    pub now: Arc<dyn Fn() -> f64 + Send + Sync>,
}

impl<T: Transport + 'static> EventRouter<T> {
    /// Spawn the router thread. It exits once `shutdown` is observed true
    /// and no further events arrive within a short poll window — the bus
    /// has no close signal of its own, so this mirrors the poll-with-
    /// timeout shutdown shape used by the scheduler and sweep threads.
    pub fn spawn(self: Arc<Self>, shutdown: Arc<AtomicBool>) -> std::thread::JoinHandle<()> {
        let rx = self.store.bus.subscribe();
        std::thread::Builder::new()
            .name("clustermon-event-router".to_string())
            .spawn(move || loop {
                match rx.recv_timeout(std::time::Duration::from_millis(200)) {
                    Ok(event) => self.handle(event),
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        if shutdown.load(Ordering::SeqCst) {
                            return;
                        }
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
                }
            })
            .expect("failed to spawn clustermon-event-router thread")
    }

    fn handle(&self, event: StoreEvent) {
        match event {
            StoreEvent::NotificationRequest {
                checkable,
                notification_type,
                ..
            } => {
                if !self.authority.holds_notification_authority(&checkable) {
                    return;
                }
                let now = (self.now)();
                send_notifications(&self.store, &AlwaysInside as &dyn TimePeriodRegistry, &self.notify_executor, &checkable, notification_type, now);
            }

            StoreEvent::AuthorityChanged { checkable, feature, owner, gained } => {
                let now = (self.now)();
                dispatch::apply_authority_change(&self.authority, &self.scheduler, feature, &checkable, gained, now);
                tracing::info!(checkable = %checkable, ?feature, owner = ?owner, gained, "authority changed");
            }

            StoreEvent::Relay {
                method,
                mut params,
                authority,
                destination,
                ..
            } => {
                // Only forward mutations this node originated; a relayed
                // mutation applied from a peer is not re-published back
                // onto the bus by `clustermon_cluster::message::apply`,
                // so in practice `authority` is always our own identity
                // today, but the check is kept as the documented
                // loop-breaker once inbound wire ingestion exists.
                if authority != self.identity {
                    return;
                }
                if let Some(dest) = &destination {
                    if let serde_json::Value::Object(ref mut map) = params {
                        map.insert("destination".to_string(), serde_json::Value::String(dest.clone()));
                    }
                }

                let now = (self.now)();
                let msg = RelayMessage::new(method, params, now, self.identity.clone());
                let endpoints: Vec<_> = self.store.all_endpoints().iter().map(|e| e.lock().clone()).collect();
                let to: Vec<String> = clustermon_cluster::recipients(&msg, &self.identity, &endpoints, now)
                    .into_iter()
                    .map(|e| e.name.clone())
                    .collect();
                if !to.is_empty() {
                    self.transport.send_relay(&msg, &to);
                }

                self.ido_sink.emit(IdoEvent {
                    table: "statehistory".to_string(),
                    kind: IdoQueryKind::Insert,
                    fields: flatten_params(&msg.params),
                    where_criteria: BTreeMap::new(),
                    category: msg.method.clone(),
                    object_reference: msg.params.get("checkable").map(|v| v.to_string()).unwrap_or_default(),
                });
            }

            _ => {}
        }
    }
}

/// Flattens a relay message's JSON params into the flat string-keyed
/// shape `IdoEvent::fields` expects; the IDO sink trait doesn't carry
/// structured JSON since the eventual SQL writer wants plain columns.
fn flatten_params(params: &serde_json::Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let serde_json::Value::Object(map) = params {
        for (k, v) in map {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.insert(k.clone(), s);
        }
    }
    out
}
