//! Relay fan-out rules and loop-avoidance link selection (spec §4.6, §4.7).

use clustermon_types::Endpoint;

use crate::message::{RelayMessage, Security};

/// Does `peer` hold the privileges `security` requires? A peer's mask is
/// the bitwise OR of its per-domain grants; an object with no declared
/// domains isn't modelled here (caller passes an all-bits mask for it).
fn has_privileges(peer: &Endpoint, security: &Security) -> bool {
    let mask = peer.domain_privileges.get(&security.object_type).copied().unwrap_or(u32::MAX);
    mask & security.privs == security.privs
}

/// The peers `msg` should fan out to, applying spec §4.7's rules: never
/// to self, never back to the source, never to a blocked link, honour an
/// explicit destination, and gate on privileges when `security` is set.
pub fn recipients<'a>(msg: &RelayMessage, self_name: &str, endpoints: &'a [Endpoint], now: f64) -> Vec<&'a Endpoint> {
    endpoints
        .iter()
        .filter(|e| e.name != self_name)
        .filter(|e| e.name != msg.source)
        .filter(|e| !e.is_blocked(now))
        .filter(|e| msg.security.as_ref().map_or(true, |sec| has_privileges(e, sec)))
        .filter(|e| destination_matches(msg, e))
        .collect()
}

fn destination_matches(msg: &RelayMessage, endpoint: &Endpoint) -> bool {
    match msg.params.get("destination").and_then(|v| v.as_str()) {
        Some(dest) => dest == endpoint.name,
        None => true,
    }
}

/// A bidirectional link candidate for the spanning-subset loop-avoidance
/// pass (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link<'a> {
    pub a: &'a str,
    pub b: &'a str,
    pub metric: f64,
}

/// Greedily select a spanning subset of `links` by ascending metric,
/// adding a link only if at least one endpoint hasn't been visited yet.
/// Rejected links are the ones the remote end should be told to block.
pub fn select_spanning_subset<'a>(mut links: Vec<Link<'a>>) -> (Vec<Link<'a>>, Vec<Link<'a>>) {
    links.sort_by(|a, b| a.metric.total_cmp(&b.metric));
    let mut visited = std::collections::HashSet::new();
    let mut kept = Vec::new();
    let mut rejected = Vec::new();

    for link in links {
        if !visited.contains(link.a) || !visited.contains(link.b) {
            visited.insert(link.a);
            visited.insert(link.b);
            kept.push(link);
        } else {
            rejected.push(link);
        }
    }
    (kept, rejected)
}
