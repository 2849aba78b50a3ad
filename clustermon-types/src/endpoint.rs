//! Endpoint (spec §3): a cluster peer, identified by its TLS CN.

use std::collections::BTreeMap;

bitflags::bitflags! {
    /// Features an endpoint advertises in its heartbeat (spec §3, §4.6).
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct Features: u8 {
        const CHECKER = 0b01;
        const NOTIFICATIONS = 0b10;
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    /// Matches the peer's TLS certificate Common Name.
    pub name: String,
    pub host: String,
    pub port: u16,
    pub connected: bool,
    pub last_seen: f64,
    /// What we've sent this peer (our log position as observed by them).
    pub remote_log_position: f64,
    /// What this peer has acknowledged receiving from us.
    pub local_log_position: f64,
    pub blocked_until: f64,
    pub syncing: bool,
    pub features: Features,
    /// Per-domain privilege mask granted to this peer, keyed by domain name.
    pub domain_privileges: BTreeMap<String, u32>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Endpoint {
            name: name.into(),
            host: host.into(),
            port,
            connected: false,
            last_seen: 0.0,
            remote_log_position: 0.0,
            local_log_position: 0.0,
            blocked_until: 0.0,
            syncing: false,
            features: Features::empty(),
            domain_privileges: BTreeMap::new(),
        }
    }

    pub fn is_fresh(&self, now: f64) -> bool {
        now - self.last_seen <= 60.0
    }

    pub fn is_blocked(&self, now: f64) -> bool {
        self.blocked_until > now
    }
}
