//! The wire-level [`Transport`] implementation this binary installs.
//!
//! `clustermon-cluster` deliberately stops at the `Transport` seam: it
//! owns tick orchestration, authority election and the replay log, but
//! not a TCP/TLS accept loop or a framed wire protocol (see that crate's
//! module docs). Building a bespoke mTLS transport from scratch is out
//! of proportion for this pass, so this binary installs a process-local
//! stand-in that logs what it would have sent instead of opening a
//! socket. `TlsIdentity` config loading and validation already exist in
//! `clustermon_cluster::tls`, so swapping in a real
//! `std::net::TcpListener` + `rustls::ServerConnection` accept loop here
//! is the only remaining piece, and it slots into this same impl.

use clustermon_cluster::{Heartbeat, RelayMessage, Transport};

pub struct LoggingTransport {
    identity: String,
}

impl LoggingTransport {
    pub fn new(identity: impl Into<String>) -> Self {
        LoggingTransport { identity: identity.into() }
    }
}

impl Transport for LoggingTransport {
    fn broadcast_heartbeat(&self, hb: &Heartbeat) {
        tracing::trace!(identity = %self.identity, peers = hb.connected_endpoints.len(), "heartbeat tick");
    }

    fn send_relay(&self, msg: &RelayMessage, to: &[String]) {
        tracing::trace!(identity = %self.identity, method = %msg.method, recipients = ?to, "relay send (no wire transport configured)");
    }
}
