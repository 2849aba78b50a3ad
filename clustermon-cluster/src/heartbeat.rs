//! Heartbeat broadcast/receipt (spec §4.6): every 5s each node announces
//! {identity, features, connected_endpoints}; receipt updates last-seen
//! and the receiver's view of the peer's neighbours. Heartbeats are not
//! persisted in the replay log.

use clustermon_types::endpoint::Features;
use clustermon_types::Endpoint;

pub const HEARTBEAT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
pub const STALE_AFTER: f64 = 60.0;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Heartbeat {
    pub identity: String,
    pub features: Features,
    pub connected_endpoints: Vec<String>,
}

/// Apply a received heartbeat: bump last-seen and (re)mark the sender
/// connected. The caller is responsible for recording the sender's
/// `connected_endpoints` view wherever it tracks network topology for
/// loop avoidance.
pub fn on_receipt(endpoint: &mut Endpoint, now: f64) {
    endpoint.last_seen = now;
    endpoint.connected = true;
}

/// Peers whose last-seen exceeds [`STALE_AFTER`] are marked disconnected;
/// returns the names of endpoints that transitioned this tick so the
/// caller can close their sockets.
pub fn expire_stale(endpoints: &mut [Endpoint], now: f64) -> Vec<String> {
    let mut expired = Vec::new();
    for e in endpoints.iter_mut() {
        if e.connected && now - e.last_seen > STALE_AFTER {
            e.connected = false;
            expired.push(e.name.clone());
        }
    }
    expired
}
