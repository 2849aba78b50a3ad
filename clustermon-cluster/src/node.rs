//! Cluster tick orchestration (spec §4.6): heartbeat broadcast, stale-peer
//! expiry, authority re-election, and replay-log GC, all driven off one
//! 5s tick. Actual socket I/O is a [`Transport`] seam so this module
//! doesn't need to own the TCP/TLS session lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use clustermon_checkable::emit_authority_change;
use clustermon_store::{ClusterFeature, Store};
use clustermon_types::endpoint::Features;
use clustermon_types::CheckableId;
use dashmap::DashMap;

use crate::authority;
use crate::heartbeat::{self, Heartbeat};
use crate::replay::ReplayLog;

pub trait Transport: Send + Sync {
    fn broadcast_heartbeat(&self, hb: &Heartbeat);

    /// Fan a relay message out to `to` (spec §4.7). Default no-op: a
    /// transport that only needs heartbeat broadcast (e.g. tests) doesn't
    /// have to implement wire-level relay send.
    fn send_relay(&self, msg: &crate::message::RelayMessage, to: &[String]) {
        let _ = (msg, to);
    }
}

const TICK_INTERVAL: Duration = Duration::from_secs(5);

struct Shutdown {
    flag: AtomicBool,
    condvar: Condvar,
    lock: Mutex<()>,
}

pub struct ClusterNode<T: Transport> {
    identity: String,
    features: Features,
    store: Arc<Store>,
    log: Arc<ReplayLog>,
    transport: Arc<T>,
    shutdown: Arc<Shutdown>,
    checker_owner: DashMap<CheckableId, Option<String>>,
    notify_owner: DashMap<CheckableId, Option<String>>,
}

impl<T: Transport + 'static> ClusterNode<T> {
    pub fn new(identity: impl Into<String>, features: Features, store: Arc<Store>, log: Arc<ReplayLog>, transport: Arc<T>) -> Self {
        ClusterNode {
            identity: identity.into(),
            features,
            store,
            log,
            transport,
            shutdown: Arc::new(Shutdown {
                flag: AtomicBool::new(false),
                condvar: Condvar::new(),
                lock: Mutex::new(()),
            }),
            checker_owner: DashMap::new(),
            notify_owner: DashMap::new(),
        }
    }

    /// Run one cluster tick: broadcast our heartbeat, expire stale peers,
    /// re-elect authority for every checkable/feature, and GC the log.
    pub fn tick(&self, now: impl Fn() -> f64) {
        let now = now();

        let connected_endpoints: Vec<String> = self
            .store
            .all_endpoints()
            .iter()
            .filter(|e| e.lock().connected)
            .map(|e| e.lock().name.clone())
            .collect();
        self.transport.broadcast_heartbeat(&Heartbeat {
            identity: self.identity.clone(),
            features: self.features,
            connected_endpoints,
        });

        let mut endpoints: Vec<clustermon_types::Endpoint> = self.store.all_endpoints().iter().map(|e| e.lock().clone()).collect();
        let expired = heartbeat::expire_stale(&mut endpoints, now);
        for name in &expired {
            if let Some(handle) = self.store.get_endpoint(name) {
                handle.lock().connected = false;
            }
            tracing::info!(peer = %name, "peer marked disconnected: last-seen exceeded 60s");
        }

        self.reelect_authority(&endpoints, now);

        let min_position = endpoints.iter().map(|e| e.local_log_position).fold(f64::INFINITY, f64::min);
        if min_position.is_finite() {
            self.log.gc(min_position);
        }
    }

    /// Re-elect authority for every checkable/feature pair and fire
    /// `OnAuthorityChanged` only where the winner actually differs from
    /// last tick (spec §4.6: "on change, OnAuthorityChanged fires").
    fn reelect_authority(&self, endpoints: &[clustermon_types::Endpoint], now: f64) {
        for (cluster_feature, bit, owners) in [
            (ClusterFeature::Checker, Features::CHECKER, &self.checker_owner),
            (ClusterFeature::Notifications, Features::NOTIFICATIONS, &self.notify_owner),
        ] {
            for handle in self.store.all_checkables() {
                let (id, owner) = {
                    let c = handle.lock();
                    let owner = authority::elect(&c, bit, &self.identity, endpoints, now).map(str::to_string);
                    (c.id.clone(), owner)
                };

                let changed = owners.get(&id).map(|prev| *prev != owner).unwrap_or(true);
                if !changed {
                    continue;
                }
                owners.insert(id.clone(), owner.clone());

                let gained = owner.as_deref() == Some(self.identity.as_str());
                emit_authority_change(&self.store, &id, cluster_feature, owner, gained);
            }
        }
    }

    /// Spawn the background tick thread.
    pub fn spawn(self: Arc<Self>, now: impl Fn() -> f64 + Send + Sync + 'static) -> ClusterHandle {
        let shutdown_for_thread = self.shutdown.clone();
        let shutdown_for_handle = self.shutdown.clone();
        let node = self;
        let join = std::thread::Builder::new()
            .name("clustermon-cluster-tick".to_string())
            .spawn(move || loop {
                let guard = shutdown_for_thread.lock.lock().unwrap_or_else(|e| e.into_inner());
                let (_guard, timeout) = shutdown_for_thread
                    .condvar
                    .wait_timeout_while(guard, TICK_INTERVAL, |_| !shutdown_for_thread.flag.load(Ordering::SeqCst))
                    .unwrap_or_else(|e| e.into_inner());
                if !timeout.timed_out() {
                    return;
                }
                node.tick(&now);
            })
            .expect("failed to spawn clustermon-cluster-tick thread");

        ClusterHandle {
            shutdown: shutdown_for_handle,
            join: Some(join),
        }
    }
}

pub struct ClusterHandle {
    shutdown: Arc<Shutdown>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl ClusterHandle {
    pub fn stop(&mut self) {
        self.shutdown.flag.store(true, Ordering::SeqCst);
        self.shutdown.condvar.notify_all();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for ClusterHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_store::StoreEvent;
    use clustermon_types::checkable::CommandLine;
    use clustermon_types::Checkable;
    use parking_lot::Mutex as PlMutex;

    #[derive(Default)]
    struct RecordingTransport {
        heartbeats: PlMutex<Vec<Heartbeat>>,
    }

    impl Transport for RecordingTransport {
        fn broadcast_heartbeat(&self, hb: &Heartbeat) {
            self.heartbeats.lock().push(hb.clone());
        }
    }

    fn node(store: Arc<Store>, transport: Arc<RecordingTransport>) -> ClusterNode<RecordingTransport> {
        ClusterNode::new("node-a", Features::CHECKER | Features::NOTIFICATIONS, store, Arc::new(ReplayLog::new()), transport)
    }

    #[test]
    fn tick_broadcasts_a_heartbeat() {
        let store = Arc::new(Store::new());
        let transport = Arc::new(RecordingTransport::default());
        let n = node(store, transport.clone());

        n.tick(|| 0.0);

        let hbs = transport.heartbeats.lock();
        assert_eq!(hbs.len(), 1);
        assert_eq!(hbs[0].identity, "node-a");
    }

    #[test]
    fn tick_marks_stale_peer_disconnected() {
        let store = Arc::new(Store::new());
        let mut peer = clustermon_types::Endpoint::new("node-b", "10.0.0.2", 5665);
        peer.connected = true;
        peer.last_seen = 0.0;
        store.insert_endpoint(peer);

        let transport = Arc::new(RecordingTransport::default());
        let n = node(store.clone(), transport);

        n.tick(|| 200.0);

        assert!(!store.get_endpoint("node-b").unwrap().lock().connected);
    }

    #[test]
    fn authority_changed_fires_once_then_suppresses_on_unchanged_reelection() {
        let store = Arc::new(Store::new());
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["x".into()]));
        store.insert_checkable(host);

        let mut peer = clustermon_types::Endpoint::new("node-a", "10.0.0.1", 5665);
        peer.connected = true;
        peer.last_seen = 0.0;
        peer.features = Features::CHECKER | Features::NOTIFICATIONS;
        store.insert_endpoint(peer);

        let transport = Arc::new(RecordingTransport::default());
        let n = node(store.clone(), transport);
        let rx = store.bus.subscribe();

        n.tick(|| 0.0);
        let first_round: Vec<_> = rx.try_iter().filter(|e| matches!(e, StoreEvent::AuthorityChanged { .. })).collect();
        assert_eq!(first_round.len(), 2, "one event per feature on first election");

        n.tick(|| 1.0);
        let second_round: Vec<_> = rx.try_iter().filter(|e| matches!(e, StoreEvent::AuthorityChanged { .. })).collect();
        assert!(second_round.is_empty(), "unchanged winner must not re-fire OnAuthorityChanged");
    }
}
