//! Authority election (spec §4.6): for each (checkable, feature) pair,
//! the owner is `candidates[hash(type+name) mod len(candidates)]` among
//! endpoints that are fresh, advertise the feature, and are permitted by
//! the checkable's `authorities` allow-list.

use sha2::{Digest, Sha256};

use clustermon_types::endpoint::Features;
use clustermon_types::{Checkable, Endpoint};

/// A stable byte hash of the election key (spec §4.6: "hash is a stable
/// byte hash"), taken from the first 8 bytes of its SHA-256 digest.
fn stable_hash(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    u64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest is >= 8 bytes"))
}

/// Candidate endpoints for electing authority over `checkable` for
/// `feature`, sorted lexicographically by identity (spec §4.6).
pub fn candidates<'a>(
    checkable: &Checkable,
    feature: Features,
    self_name: &str,
    endpoints: &'a [Endpoint],
    now: f64,
) -> Vec<&'a str> {
    let mut names: Vec<&str> = endpoints
        .iter()
        .filter(|e| (e.is_fresh(now) || e.name == self_name) && e.features.contains(feature))
        .filter(|e| checkable.authorities.is_empty() || checkable.authorities.iter().any(|a| a == &e.name))
        .map(|e| e.name.as_str())
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Elect the owner for `checkable`'s `feature`. Returns `None` if there
/// are no eligible candidates (e.g. nobody advertises the feature).
pub fn elect<'a>(checkable: &Checkable, feature: Features, self_name: &str, endpoints: &'a [Endpoint], now: f64) -> Option<&'a str> {
    let candidates = candidates(checkable, feature, self_name, endpoints, now);
    if candidates.is_empty() {
        return None;
    }
    let index = (stable_hash(&checkable.id.hash_key()) as usize) % candidates.len();
    Some(candidates[index])
}
